pub mod selector;

pub use selector::{qualifies_as_round, SelectionEngine, SelectionError};
