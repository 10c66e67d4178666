use crate::capture::capture_products;
use crate::state::{OrderState, StepError, StepResult};
use dual_invest_core::ui::{locate_visible, locate_visible_in, UiBridge, UiElement, UiError, UiTarget};
use dual_invest_core::{
    FailureReason, PurchaseSession, MAX_PRICE_DRIFT_RETRIES, ORDER_SUCCESS_MARKER,
};
use dual_invest_product_selector::{SelectionEngine, SelectionError};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives one purchase attempt on an already opened product page.
///
/// Each state is handled by one step that returns the next state. Business
/// failures end the session as `Failed`, a missing success signal ends it as
/// `Unknown`, and only a lost browser session escapes [`run`](Self::run).
pub struct OrderStateMachine<'a, B: UiBridge + ?Sized> {
    bridge: &'a B,
    engine: SelectionEngine,
    amount: Decimal,
    settle: Duration,
    max_drift_retries: u32,
}

impl<'a, B: UiBridge + ?Sized> OrderStateMachine<'a, B> {
    #[must_use]
    pub fn new(bridge: &'a B, amount: Decimal, settle: Duration) -> Self {
        Self {
            bridge,
            engine: SelectionEngine::new(),
            amount,
            settle,
            max_drift_retries: MAX_PRICE_DRIFT_RETRIES,
        }
    }

    /// Runs the machine until the session reaches a terminal status.
    ///
    /// # Errors
    /// Returns the bridge error when the browser session is lost. Every other
    /// failure is recorded on `session`.
    pub async fn run(&self, session: &mut PurchaseSession) -> Result<(), UiError> {
        let mut state = OrderState::SelectingProduct;

        while !state.is_terminal() {
            debug!(?state, "Order step");
            state = match self.step(&state, session).await {
                Ok(next) => next,
                Err(StepError::Business(reason)) => OrderState::Failed(reason),
                Err(StepError::Ui(e)) if e.is_session_lost() => return Err(e),
                Err(StepError::Ui(e)) => {
                    warn!(?state, error = %e, "UI step failed");
                    OrderState::Failed(FailureReason::Fault(e.to_string()))
                }
            };
        }

        match state {
            OrderState::Succeeded => {
                info!(amount = %self.amount, "Order placed");
                session.succeed();
            }
            OrderState::Unknown => {
                warn!("Order submitted but outcome could not be confirmed");
                session.mark_unknown();
            }
            OrderState::Failed(reason) => {
                warn!(reason = %reason, "Order failed");
                session.fail(reason);
            }
            _ => {}
        }
        Ok(())
    }

    /// Executes the step for `state` and returns the state that follows.
    ///
    /// # Errors
    /// See [`StepError`].
    pub async fn step(&self, state: &OrderState, session: &mut PurchaseSession) -> StepResult {
        match state {
            OrderState::SelectingProduct | OrderState::ReselectingProduct => {
                self.select_product(session).await?;
                Ok(OrderState::AwaitingDialog)
            }
            OrderState::AwaitingDialog => {
                self.settle().await;
                if locate_visible(self.bridge, UiTarget::OrderDialog).await?.is_none() {
                    debug!("Order dialog not detected, continuing on page");
                }
                Ok(OrderState::CheckingPriceDrift)
            }
            OrderState::CheckingPriceDrift => {
                if locate_visible(self.bridge, UiTarget::PriceDriftNotice)
                    .await?
                    .is_none()
                {
                    return Ok(OrderState::FillingAmount);
                }
                session.drift_retries += 1;
                warn!(
                    attempt = session.drift_retries,
                    max = self.max_drift_retries,
                    "Price changed before order"
                );
                if session.drift_retries >= self.max_drift_retries {
                    return Ok(OrderState::Failed(FailureReason::PriceDriftExhausted {
                        attempts: session.drift_retries,
                    }));
                }
                Ok(OrderState::ClosingDialog)
            }
            OrderState::ClosingDialog => {
                match locate_visible(self.bridge, UiTarget::DialogClose).await? {
                    Some(close) => close.click().await?,
                    None => self.bridge.dismiss().await?,
                }
                self.settle().await;
                Ok(OrderState::ReselectingProduct)
            }
            OrderState::FillingAmount => {
                self.fill_amount().await?;
                Ok(OrderState::AcceptingAgreement)
            }
            OrderState::AcceptingAgreement => {
                self.accept_agreement().await?;
                Ok(OrderState::Submitting)
            }
            OrderState::Submitting => {
                self.settle().await;
                let button = locate_visible(self.bridge, UiTarget::OrderButton)
                    .await?
                    .ok_or(FailureReason::OrderButtonUnavailable)?;
                if !button.is_enabled().await? {
                    return Err(FailureReason::OrderButtonUnavailable.into());
                }
                button.click().await?;
                self.settle().await;
                Ok(OrderState::AwaitingConfirmation)
            }
            OrderState::AwaitingConfirmation => {
                if let Some(confirm) = locate_visible(self.bridge, UiTarget::ConfirmButton).await? {
                    if confirm.is_enabled().await? {
                        return Ok(OrderState::Confirming);
                    }
                }
                debug!("No confirmation step");
                Ok(OrderState::AwaitingResult)
            }
            OrderState::Confirming => {
                if let Some(confirm) = locate_visible(self.bridge, UiTarget::ConfirmButton).await? {
                    confirm.click().await?;
                    self.settle().await;
                }
                Ok(OrderState::AwaitingResult)
            }
            OrderState::AwaitingResult => self.classify_result().await,
            OrderState::Succeeded | OrderState::Failed(_) | OrderState::Unknown => {
                Ok(state.clone())
            }
        }
    }

    /// Captures the current product list, picks one and opens its order dialog.
    async fn select_product(&self, session: &mut PurchaseSession) -> Result<(), StepError> {
        let candidates = capture_products(self.bridge).await?;
        let selected = match self.engine.select(&candidates) {
            Ok(product) => product.clone(),
            Err(SelectionError::NoProductsAvailable) => {
                session.candidates = candidates;
                return Err(FailureReason::NoProductsAvailable.into());
            }
        };
        session.candidates = candidates;

        info!(
            price = %selected.price_label(),
            duration = %selected.duration,
            apr = %selected.apr,
            "Product selected"
        );
        let index = selected.index;
        session.select(selected);

        let rows = self.bridge.locate(UiTarget::ProductRow).await?;
        let row = rows
            .into_iter()
            .nth(index)
            .ok_or(FailureReason::BuyButtonUnavailable)?;
        let buy = locate_visible_in(&row, UiTarget::BuyButton)
            .await?
            .ok_or(FailureReason::BuyButtonUnavailable)?;
        if !buy.is_enabled().await? {
            return Err(FailureReason::BuyButtonUnavailable.into());
        }
        buy.click().await?;
        Ok(())
    }

    /// Puts the investment amount into the order dialog.
    ///
    /// Leaves the field alone when it already holds the amount. Returns
    /// whether the field was written.
    ///
    /// # Errors
    /// [`FailureReason::AmountFieldNotFound`] when the field is missing.
    pub async fn fill_amount(&self) -> Result<bool, StepError> {
        let input = locate_visible(self.bridge, UiTarget::AmountInput)
            .await?
            .ok_or(FailureReason::AmountFieldNotFound)?;

        let current = input.value().await?;
        let normalized = current.replace(',', "");
        if Decimal::from_str(normalized.trim()).is_ok_and(|v| v == self.amount) {
            debug!(value = %current, "Amount already filled");
            return Ok(false);
        }

        let text = self.amount.normalize().to_string();
        input.fill(&text).await?;
        info!(amount = %text, "Investment amount filled");
        Ok(true)
    }

    /// Ticks the agreement checkbox unless it is already ticked. Returns
    /// whether it was clicked.
    ///
    /// # Errors
    /// [`FailureReason::AgreementCheckboxNotFound`] when the checkbox is missing.
    pub async fn accept_agreement(&self) -> Result<bool, StepError> {
        let checkbox = locate_visible(self.bridge, UiTarget::AgreementCheckbox)
            .await?
            .ok_or(FailureReason::AgreementCheckboxNotFound)?;

        if checkbox.is_checked().await? {
            debug!("Agreement already accepted");
            return Ok(false);
        }
        checkbox.click().await?;
        debug!("Agreement accepted");
        Ok(true)
    }

    async fn classify_result(&self) -> StepResult {
        if let Some(surface) = locate_visible(self.bridge, UiTarget::ResultSurface).await? {
            if surface.text_content().await?.contains(ORDER_SUCCESS_MARKER) {
                debug!("Success marker on result surface");
                return Ok(OrderState::Succeeded);
            }
        }

        if self.bridge.page_text().await?.contains(ORDER_SUCCESS_MARKER) {
            debug!("Success marker found in page text");
            return Ok(OrderState::Succeeded);
        }

        Ok(OrderState::Unknown)
    }

    async fn settle(&self) {
        self.bridge.wait(self.settle).await;
    }
}
