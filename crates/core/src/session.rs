//! Stage session records and the per-tick run report.
//!
//! Each stage creates its session at start, drives it to exactly one terminal
//! status and hands it back by value. Status changes are one-way: once a
//! session leaves `Pending`, further `conclude` calls are ignored.

use crate::constants::MIN_REDEMPTION_THRESHOLD;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A structured product row as captured from the purchase page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Row position on the page, used to reach the row's buy control again.
    pub index: usize,
    /// Strike price text exactly as displayed (e.g. "2,450").
    pub displayed_price: String,
    pub price_offset: String,
    pub settlement_date: String,
    pub duration: String,
    pub apr: String,
    pub is_vip: bool,
}

impl Product {
    /// Strike price with its offset appended when one was shown.
    #[must_use]
    pub fn price_label(&self) -> String {
        let offset = self.price_offset.trim();
        if offset.is_empty() || offset == "N/A" {
            self.displayed_price.clone()
        } else {
            format!("{} ({})", self.displayed_price, offset)
        }
    }
}

/// A redeemable savings position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSource {
    pub amount: Decimal,
    /// Row position on the redemption page.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Pending,
    Success,
    Failed,
    /// The flow completed but the outcome could not be confirmed.
    Unknown,
}

impl SessionStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Why a session ended as `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("no eligible products available")]
    NoProductsAvailable,

    #[error("insufficient funds: {available} available, at least {required} required")]
    InsufficientFunds { available: Decimal, required: Decimal },

    #[error("target amount {target} is below the minimum redemption of {minimum}")]
    TargetBelowMinimum { target: Decimal, minimum: u64 },

    #[error("price changed {attempts} times before the order could be placed")]
    PriceDriftExhausted { attempts: u32 },

    #[error("investment amount field not found")]
    AmountFieldNotFound,

    #[error("agreement checkbox not found")]
    AgreementCheckboxNotFound,

    #[error("order button unavailable")]
    OrderButtonUnavailable,

    #[error("buy button of the selected product unavailable")]
    BuyButtonUnavailable,

    #[error("no redeemable positions found")]
    NoRedeemableSources,

    #[error("redemption of position #{index} failed: {detail}")]
    RedemptionStepFailed { index: usize, detail: String },

    /// UI or process fault that ended the stage.
    #[error("{0}")]
    Fault(String),
}

/// Outcome record of one purchase stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseSession {
    pub timestamp: DateTime<Utc>,
    pub candidates: Vec<Product>,
    pub selected: Option<Product>,
    pub investment_amount: Decimal,
    pub currency: String,
    /// Product side the order was placed on (e.g. "Buy Low").
    pub product_side: String,
    /// Price-drift detections seen during this session.
    pub drift_retries: u32,
    status: SessionStatus,
    failure_reason: Option<FailureReason>,
}

impl PurchaseSession {
    #[must_use]
    pub fn new(
        investment_amount: Decimal,
        currency: impl Into<String>,
        product_side: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            candidates: Vec::new(),
            selected: None,
            investment_amount,
            currency: currency.into(),
            product_side: product_side.into(),
            drift_retries: 0,
            status: SessionStatus::Pending,
            failure_reason: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub const fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    /// Records a candidate pick. VIP products are never recorded as selected.
    ///
    /// Returns `false` when the product was refused.
    pub fn select(&mut self, product: Product) -> bool {
        if product.is_vip || self.status.is_terminal() {
            return false;
        }
        self.selected = Some(product);
        true
    }

    /// Moves the session to a terminal status.
    ///
    /// Returns `false` (and changes nothing) if the session already ended or
    /// `status` is `Pending`.
    pub fn conclude(&mut self, status: SessionStatus, reason: Option<FailureReason>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.failure_reason = if status == SessionStatus::Failed {
            reason
        } else {
            None
        };
        true
    }

    pub fn succeed(&mut self) -> bool {
        self.conclude(SessionStatus::Success, None)
    }

    pub fn fail(&mut self, reason: FailureReason) -> bool {
        self.conclude(SessionStatus::Failed, Some(reason))
    }

    pub fn mark_unknown(&mut self) -> bool {
        self.conclude(SessionStatus::Unknown, None)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SessionStatus::Success
    }
}

/// Outcome record of one redemption stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionSession {
    pub timestamp: DateTime<Utc>,
    /// Requested redemption target before adjustment.
    pub target_amount: Decimal,
    /// Target after adjustment to available funds, once allocated.
    pub adjusted_target: Option<u64>,
    pub currency: String,
    pub available_sources: Vec<FundingSource>,
    pub redeemed_sources: Vec<FundingSource>,
    pub total_redeemed: Decimal,
    status: SessionStatus,
    failure_reason: Option<FailureReason>,
}

impl RedemptionSession {
    #[must_use]
    pub fn new(target_amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            target_amount,
            adjusted_target: None,
            currency: currency.into(),
            available_sources: Vec::new(),
            redeemed_sources: Vec::new(),
            total_redeemed: Decimal::ZERO,
            status: SessionStatus::Pending,
            failure_reason: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub const fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    /// Adds a successfully redeemed source to the running total.
    pub fn record_redeemed(&mut self, source: FundingSource) {
        if self.status.is_terminal() {
            return;
        }
        self.total_redeemed += source.amount;
        self.redeemed_sources.push(source);
    }

    pub fn fail(&mut self, reason: FailureReason) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Failed;
        self.failure_reason = Some(reason);
        true
    }

    /// Marks the session successful.
    ///
    /// A success below the platform minimum is impossible, so a total under
    /// the threshold concludes the session as failed instead. Returns whether
    /// the session ended as `Success`.
    pub fn succeed(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let minimum = Decimal::from(MIN_REDEMPTION_THRESHOLD);
        if self.total_redeemed < minimum {
            self.fail(FailureReason::InsufficientFunds {
                available: self.total_redeemed,
                required: minimum,
            });
            return false;
        }
        self.status = SessionStatus::Success;
        true
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SessionStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Success,
    Partial,
    Failed,
}

impl OverallStatus {
    #[must_use]
    pub const fn from_stages(redemption_ok: bool, purchase_ok: bool) -> Self {
        match (redemption_ok, purchase_ok) {
            (true, true) => Self::Success,
            (false, false) => Self::Failed,
            _ => Self::Partial,
        }
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub redemption: RedemptionSession,
    pub purchase: PurchaseSession,
    pub overall_status: OverallStatus,
}

impl RunReport {
    #[must_use]
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        redemption: RedemptionSession,
        purchase: PurchaseSession,
    ) -> Self {
        let overall_status =
            OverallStatus::from_stages(redemption.is_success(), purchase.is_success());
        Self {
            start_time,
            end_time,
            redemption,
            purchase,
            overall_status,
        }
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: &str, is_vip: bool) -> Product {
        Product {
            index: 0,
            displayed_price: price.to_string(),
            price_offset: "-2.1%".to_string(),
            settlement_date: "2025-06-01".to_string(),
            duration: "1 Day".to_string(),
            apr: "120%".to_string(),
            is_vip,
        }
    }

    #[test]
    fn purchase_status_is_monotonic() {
        let mut session = PurchaseSession::new(dec!(20), "USDT", "Buy Low");

        assert!(session.fail(FailureReason::OrderButtonUnavailable));
        assert!(!session.succeed());
        assert!(!session.mark_unknown());
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(
            session.failure_reason(),
            Some(&FailureReason::OrderButtonUnavailable)
        );
    }

    #[test]
    fn conclude_rejects_pending() {
        let mut session = PurchaseSession::new(dec!(20), "USDT", "Buy Low");

        assert!(!session.conclude(SessionStatus::Pending, None));
        assert_eq!(session.status(), SessionStatus::Pending);
    }

    #[test]
    fn vip_product_is_never_selected() {
        let mut session = PurchaseSession::new(dec!(20), "USDT", "Buy Low");

        assert!(!session.select(product("2,450", true)));
        assert!(session.selected.is_none());
        assert!(session.select(product("2,450", false)));
    }

    #[test]
    fn redemption_success_requires_minimum() {
        let mut session = RedemptionSession::new(dec!(20), "USDT");
        session.record_redeemed(FundingSource {
            amount: dec!(12),
            index: 0,
        });

        assert!(!session.succeed());
        assert_eq!(session.status(), SessionStatus::Failed);
    }

    #[test]
    fn redemption_success_accumulates_total() {
        let mut session = RedemptionSession::new(dec!(20), "USDT");
        session.record_redeemed(FundingSource {
            amount: dec!(12),
            index: 0,
        });
        session.record_redeemed(FundingSource {
            amount: dec!(9),
            index: 1,
        });

        assert!(session.succeed());
        assert_eq!(session.total_redeemed, dec!(21));
        assert!(!session.fail(FailureReason::NoRedeemableSources));
    }

    #[test]
    fn overall_status_combinations() {
        assert_eq!(OverallStatus::from_stages(true, true), OverallStatus::Success);
        assert_eq!(OverallStatus::from_stages(true, false), OverallStatus::Partial);
        assert_eq!(OverallStatus::from_stages(false, true), OverallStatus::Partial);
        assert_eq!(OverallStatus::from_stages(false, false), OverallStatus::Failed);
    }

    #[test]
    fn unknown_purchase_is_not_success() {
        let mut purchase = PurchaseSession::new(dec!(20), "USDT", "Buy Low");
        purchase.mark_unknown();
        let mut redemption = RedemptionSession::new(dec!(20), "USDT");
        redemption.record_redeemed(FundingSource {
            amount: dec!(25),
            index: 0,
        });
        redemption.succeed();

        let report = RunReport::new(Utc::now(), Utc::now(), redemption, purchase);

        assert_eq!(report.overall_status, OverallStatus::Partial);
    }

    #[test]
    fn price_label_skips_missing_offset() {
        let mut p = product("2,450", false);
        assert_eq!(p.price_label(), "2,450 (-2.1%)");

        p.price_offset = "N/A".to_string();
        assert_eq!(p.price_label(), "2,450");
    }
}
