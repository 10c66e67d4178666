pub mod carried_amount;
pub mod config;
pub mod config_loader;
pub mod constants;
pub mod report_formatter;
pub mod session;
pub mod traits;
pub mod ui;

#[cfg(feature = "testing")]
pub mod testing;

pub use carried_amount::{CarriedAmountStore, PersistenceError};
pub use config::{
    AppConfig, BrowserConfig, InvestConfig, ScheduleConfig, StateConfig, TelegramConfig,
};
pub use config_loader::ConfigLoader;
pub use constants::{MAX_PRICE_DRIFT_RETRIES, MIN_REDEMPTION_THRESHOLD, ORDER_SUCCESS_MARKER};
pub use report_formatter::ReportFormatter;
pub use session::{
    FailureReason, FundingSource, OverallStatus, Product, PurchaseSession, RedemptionSession,
    RunReport, SessionStatus,
};
pub use traits::{Notifier, PurchaseStage, RedemptionStage};
pub use ui::{UiBridge, UiElement, UiError, UiTarget};
