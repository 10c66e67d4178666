use dual_invest_core::{FailureReason, UiError};
use thiserror::Error;

/// Steps of a single purchase attempt.
///
/// The drift cycle `AwaitingDialog -> CheckingPriceDrift -> ClosingDialog ->
/// ReselectingProduct -> AwaitingDialog` is bounded by the drift retry limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderState {
    SelectingProduct,
    AwaitingDialog,
    CheckingPriceDrift,
    ClosingDialog,
    ReselectingProduct,
    FillingAmount,
    AcceptingAgreement,
    Submitting,
    AwaitingConfirmation,
    Confirming,
    AwaitingResult,
    Succeeded,
    Failed(FailureReason),
    /// The order went out but no success signal was found.
    Unknown,
}

impl OrderState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::Unknown)
    }
}

/// Why a step could not produce its next state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// A platform condition that ends the session as failed.
    #[error(transparent)]
    Business(#[from] FailureReason),

    /// The bridge gave up after its own retries.
    #[error(transparent)]
    Ui(#[from] UiError),
}

pub type StepResult = Result<OrderState, StepError>;
