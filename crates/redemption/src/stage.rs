use crate::allocator::RedemptionAllocator;
use crate::capture::{capture_sources, find_source_row};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dual_invest_core::ui::{locate_visible, locate_visible_in, UiBridge, UiElement, UiError, UiTarget};
use dual_invest_core::{
    AppConfig, CarriedAmountStore, FailureReason, FundingSource, RedemptionSession,
    RedemptionStage,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a single position's redeem flow ended.
#[derive(Debug)]
enum SourceOutcome {
    Redeemed,
    Failed(String),
}

/// Redemption stage driven through the browser.
///
/// Captures the redeemable positions, allocates them against the configured
/// amount and redeems the chosen positions one by one. The adjusted target is
/// written to the carried amount store only when every chosen position was
/// redeemed.
pub struct BrowserRedemptionStage<B: UiBridge> {
    bridge: Arc<B>,
    allocator: RedemptionAllocator,
    store: CarriedAmountStore,
    target: Decimal,
    currency: String,
    url: String,
    settle: Duration,
}

impl<B: UiBridge> BrowserRedemptionStage<B> {
    #[must_use]
    pub fn new(bridge: Arc<B>, config: &AppConfig) -> Self {
        Self {
            bridge,
            allocator: RedemptionAllocator::new(),
            store: CarriedAmountStore::new(&config.state.carried_amount_path),
            target: config.invest.investment_amount,
            currency: config.invest.currency.clone(),
            url: config.browser.redemption_url.clone(),
            settle: Duration::from_millis(config.browser.settle_ms),
        }
    }

    async fn settle(&self) {
        self.bridge.wait(self.settle).await;
    }

    async fn run(&self, session: &mut RedemptionSession) -> Result<(), UiError> {
        info!(url = %self.url, "Opening savings page");
        self.bridge.navigate(&self.url).await?;
        self.settle().await;

        session.available_sources = capture_sources(self.bridge.as_ref(), &self.currency).await?;
        if session.available_sources.is_empty() {
            session.fail(FailureReason::NoRedeemableSources);
            return Ok(());
        }

        let allocation = match self
            .allocator
            .allocate(&session.available_sources, session.target_amount)
        {
            Ok(allocation) => allocation,
            Err(e) => {
                warn!(error = %e, "Allocation failed");
                session.fail(e.into());
                return Ok(());
            }
        };
        session.adjusted_target = Some(allocation.adjusted_target);
        info!(
            target = allocation.adjusted_target,
            positions = allocation.sources.len(),
            planned = %allocation.planned_total(),
            "Redemption planned"
        );

        for source in allocation.sources {
            match self.redeem_one(&source).await {
                Ok(SourceOutcome::Redeemed) => {
                    info!(index = source.index, amount = %source.amount, "Position redeemed");
                    session.record_redeemed(source);
                }
                Ok(SourceOutcome::Failed(detail)) => {
                    self.recover().await?;
                    session.fail(FailureReason::RedemptionStepFailed {
                        index: source.index,
                        detail,
                    });
                    return Ok(());
                }
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => {
                    self.recover().await?;
                    session.fail(FailureReason::RedemptionStepFailed {
                        index: source.index,
                        detail: e.to_string(),
                    });
                    return Ok(());
                }
            }
        }

        if session.succeed() {
            if let Err(e) = self.store.save(allocation.adjusted_target) {
                error!(error = %e, "Failed to persist carried amount");
            }
        }
        Ok(())
    }

    async fn redeem_one(&self, source: &FundingSource) -> Result<SourceOutcome, UiError> {
        let Some(row) = find_source_row(self.bridge.as_ref(), source, &self.currency).await?
        else {
            return Ok(SourceOutcome::Failed("position row disappeared".to_string()));
        };

        let Some(button) = locate_visible_in(&row, UiTarget::RedeemButton).await? else {
            return Ok(SourceOutcome::Failed("redeem button not found".to_string()));
        };
        button.click().await?;
        self.settle().await;

        if locate_visible(self.bridge.as_ref(), UiTarget::RedeemDialog)
            .await?
            .is_none()
        {
            debug!("Redeem dialog not detected, continuing on page");
        }

        let Some(input) = locate_visible(self.bridge.as_ref(), UiTarget::RedeemAmountInput).await?
        else {
            return Ok(SourceOutcome::Failed("amount field not found".to_string()));
        };
        let amount = source.amount.normalize().to_string();
        input.fill(&amount).await?;
        debug!(%amount, "Filled redeem amount");

        let Some(confirm) =
            locate_visible(self.bridge.as_ref(), UiTarget::RedeemConfirmButton).await?
        else {
            return Ok(SourceOutcome::Failed("confirm button not found".to_string()));
        };
        if !confirm.is_enabled().await? {
            return Ok(SourceOutcome::Failed("confirm button disabled".to_string()));
        }
        confirm.click().await?;
        self.settle().await;

        if locate_visible(self.bridge.as_ref(), UiTarget::RedeemSuccessNotice)
            .await?
            .is_none()
        {
            return Ok(SourceOutcome::Failed("no success notice".to_string()));
        }

        match locate_visible(self.bridge.as_ref(), UiTarget::NoticeClose).await? {
            Some(close) => close.click().await?,
            None => self.bridge.dismiss().await?,
        }
        self.settle().await;

        Ok(SourceOutcome::Redeemed)
    }

    /// Leaves whatever dialog a failed step left open.
    async fn recover(&self) -> Result<(), UiError> {
        match self.bridge.dismiss().await {
            Err(e) if e.is_session_lost() => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<B: UiBridge + 'static> RedemptionStage for BrowserRedemptionStage<B> {
    async fn redeem(&self) -> Result<RedemptionSession> {
        let mut session = RedemptionSession::new(self.target, &self.currency);

        match self.run(&mut session).await {
            Ok(()) => {}
            Err(e) if e.is_session_lost() => {
                return Err(anyhow!(e).context("redemption stage aborted"));
            }
            Err(e) => {
                warn!(error = %e, "Redemption interrupted by UI error");
                session.fail(FailureReason::Fault(e.to_string()));
            }
        }

        info!(
            status = ?session.status(),
            total = %session.total_redeemed,
            "Redemption stage finished"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dual_invest_core::testing::{FakeBridge, FakeFundingRow, FakePage};
    use dual_invest_core::SessionStatus;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn setup(page: FakePage) -> (TempDir, Arc<FakeBridge>, BrowserRedemptionStage<FakeBridge>) {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.state.carried_amount_path = dir
            .path()
            .join("carried")
            .to_string_lossy()
            .into_owned();
        config.browser.settle_ms = 0;

        let bridge = Arc::new(FakeBridge::new(page));
        let stage = BrowserRedemptionStage::new(Arc::clone(&bridge), &config);
        (dir, bridge, stage)
    }

    #[tokio::test]
    async fn test_redeems_largest_first_and_persists_target() {
        let (_dir, bridge, stage) = setup(FakePage::with_funding(vec![
            FakeFundingRow::usdt("9"),
            FakeFundingRow::usdt("12"),
        ]));

        let session = stage.redeem().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(session.total_redeemed, dec!(21));
        assert_eq!(session.adjusted_target, Some(20));
        assert_eq!(bridge.page().redeemed_rows, vec![1, 0]);
        assert_eq!(stage.store.load().unwrap(), Some(20));
    }

    #[tokio::test]
    async fn test_stops_once_target_reached() {
        let (_dir, bridge, stage) = setup(FakePage::with_funding(vec![
            FakeFundingRow::usdt("9"),
            FakeFundingRow::usdt("25"),
        ]));

        let session = stage.redeem().await.unwrap();

        assert!(session.is_success());
        assert_eq!(session.redeemed_sources.len(), 1);
        assert_eq!(bridge.page().redeemed_rows, vec![1]);
        assert_eq!(bridge.page().redeem_amount_value, "25");
    }

    #[tokio::test]
    async fn test_redeemed_rows_leaving_the_page_do_not_shift_targets() {
        let mut page = FakePage::with_funding(vec![
            FakeFundingRow::usdt("12"),
            FakeFundingRow::usdt("9"),
            FakeFundingRow {
                text: "BTC Flexible 0.5 BTC Redeem".to_string(),
                redeemable: true,
                fails: false,
            },
        ]);
        page.drop_redeemed = true;
        let (_dir, bridge, stage) = setup(page);

        let session = stage.redeem().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(session.total_redeemed, dec!(21));
        let page = bridge.page();
        assert_eq!(
            page.redeemed_texts,
            vec![
                "USDT Flexible 12 USDT Redeem".to_string(),
                "USDT Flexible 9 USDT Redeem".to_string(),
            ]
        );
        assert_eq!(page.funding_rows.len(), 1);
        assert!(page.funding_rows[0].text.starts_with("BTC"));
    }

    #[tokio::test]
    async fn test_vanished_position_fails_step() {
        let (_dir, bridge, stage) = setup(FakePage::with_funding(vec![
            FakeFundingRow::usdt("12"),
            FakeFundingRow::usdt("9"),
        ]));
        let source = FundingSource {
            amount: dec!(15),
            index: 0,
        };

        let outcome = stage.redeem_one(&source).await.unwrap();

        assert!(matches!(outcome, SourceOutcome::Failed(ref d) if d.contains("disappeared")));
        assert!(bridge.page().redeemed_rows.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_store_untouched() {
        let (_dir, bridge, stage) = setup(FakePage::with_funding(vec![
            FakeFundingRow::usdt("15"),
            FakeFundingRow::usdt("3"),
        ]));

        let session = stage.redeem().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(matches!(
            session.failure_reason(),
            Some(FailureReason::InsufficientFunds { .. })
        ));
        assert!(bridge.page().redeemed_rows.is_empty());
        assert_eq!(stage.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_positions() {
        let (_dir, _bridge, stage) = setup(FakePage::default());

        let session = stage.redeem().await.unwrap();

        assert_eq!(
            session.failure_reason(),
            Some(&FailureReason::NoRedeemableSources)
        );
    }

    #[tokio::test]
    async fn test_failed_position_aborts_without_persisting() {
        let mut failing = FakeFundingRow::usdt("9");
        failing.fails = true;
        let (_dir, bridge, stage) = setup(FakePage::with_funding(vec![
            FakeFundingRow::usdt("12"),
            failing,
        ]));

        let session = stage.redeem().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(matches!(
            session.failure_reason(),
            Some(FailureReason::RedemptionStepFailed { index: 1, .. })
        ));
        assert_eq!(session.total_redeemed, dec!(12));
        assert!(bridge.page().dismissals >= 1);
        assert_eq!(stage.store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_lost_browser_escapes_stage() {
        let mut page = FakePage::with_funding(vec![FakeFundingRow::usdt("50")]);
        page.session_lost = true;
        let (_dir, _bridge, stage) = setup(page);

        let result = stage.redeem().await;

        assert!(result.is_err());
    }
}
