use crate::session::{PurchaseSession, RedemptionSession};
use anyhow::Result;
use async_trait::async_trait;

/// Best-effort message delivery. Implementations log their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns `true` if the message was accepted for delivery.
    async fn send(&self, text: &str) -> bool;
}

/// First stage of a run: free up funds for the purchase.
///
/// Business failures are reported through the returned session's status; an
/// `Err` means the stage could not run at all (e.g. the browser is gone).
#[async_trait]
pub trait RedemptionStage: Send + Sync {
    async fn redeem(&self) -> Result<RedemptionSession>;
}

/// Second stage of a run: invest the carried amount.
///
/// Same error contract as [`RedemptionStage`].
#[async_trait]
pub trait PurchaseStage: Send + Sync {
    async fn purchase(&self) -> Result<PurchaseSession>;
}
