pub mod capture;
pub mod machine;
pub mod navigation;
pub mod stage;
pub mod state;

pub use capture::capture_products;
pub use machine::OrderStateMachine;
pub use navigation::open_market;
pub use stage::BrowserPurchaseStage;
pub use state::{OrderState, StepError};
