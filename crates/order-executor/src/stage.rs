use crate::machine::OrderStateMachine;
use crate::navigation::open_market;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dual_invest_core::{
    AppConfig, CarriedAmountStore, FailureReason, PurchaseSession, PurchaseStage, UiBridge,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Purchase stage driven through the browser.
///
/// Invests the amount carried over from the last successful redemption, or
/// the configured amount when nothing was carried yet.
pub struct BrowserPurchaseStage<B: UiBridge> {
    bridge: Arc<B>,
    store: CarriedAmountStore,
    default_amount: Decimal,
    currency: String,
    pair: String,
    side: String,
    url: String,
    settle: Duration,
}

impl<B: UiBridge> BrowserPurchaseStage<B> {
    #[must_use]
    pub fn new(bridge: Arc<B>, config: &AppConfig) -> Self {
        Self {
            bridge,
            store: CarriedAmountStore::new(&config.state.carried_amount_path),
            default_amount: config.invest.investment_amount,
            currency: config.invest.currency.clone(),
            pair: config.invest.product_pair.clone(),
            side: config.invest.product_side.clone(),
            url: config.browser.purchase_url.clone(),
            settle: Duration::from_millis(config.browser.settle_ms),
        }
    }
}

#[async_trait]
impl<B: UiBridge + 'static> PurchaseStage for BrowserPurchaseStage<B> {
    async fn purchase(&self) -> Result<PurchaseSession> {
        let amount = self.store.resolve(self.default_amount);
        let mut session = PurchaseSession::new(amount, &self.currency, &self.side);
        info!(%amount, currency = %self.currency, pair = %self.pair, side = %self.side, "Starting purchase");

        let bridge = self.bridge.as_ref();
        let outcome = match open_market(bridge, &self.url, &self.pair, &self.side, self.settle).await {
            Ok(()) => {
                OrderStateMachine::new(bridge, amount, self.settle)
                    .run(&mut session)
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_session_lost() => {
                return Err(anyhow!(e).context("purchase stage aborted"));
            }
            Err(e) => {
                warn!(error = %e, "Could not open the product page");
                session.fail(FailureReason::Fault(e.to_string()));
            }
        }

        info!(status = ?session.status(), "Purchase stage finished");
        Ok(session)
    }
}
