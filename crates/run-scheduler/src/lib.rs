pub mod scheduler;

pub use scheduler::{shutdown_signal, RunScheduler, LIVENESS_CHECK};
