//! CLI commands for the redeem-and-invest automation.

pub mod browser_session;
pub mod run;
pub mod show_config;

pub use browser_session::{SessionPurchase, SessionRedemption};
pub use run::{run_daemon, run_once, run_purchase, run_redeem};
pub use show_config::show_config;
