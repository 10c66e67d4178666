//! Stages that open their own browser session.
//!
//! Each stage execution starts a fresh WebDriver session and closes it when
//! the stage returns or panics, so a crashed browser only costs the stage it
//! happened in.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dual_invest_core::{AppConfig, PurchaseSession, PurchaseStage, RedemptionSession, RedemptionStage};
use dual_invest_order::BrowserPurchaseStage;
use dual_invest_redemption::BrowserRedemptionStage;
use dual_invest_webdriver::WebDriverBridge;
use futures::FutureExt;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

async fn connect(config: &AppConfig) -> Result<Arc<WebDriverBridge>> {
    let bridge = WebDriverBridge::connect(&config.browser)
        .await
        .with_context(|| {
            format!(
                "Failed to start browser session on {}",
                config.browser.webdriver_url
            )
        })?;
    Ok(Arc::new(bridge))
}

/// Awaits `stage`, then `close`, even when the stage panics. The panic is
/// resumed after closing so the scheduler still records the fault.
async fn closing_after<T, S, C>(stage: S, close: C) -> T
where
    S: Future<Output = T>,
    C: Future<Output = ()>,
{
    let outcome = AssertUnwindSafe(stage).catch_unwind().await;
    close.await;
    match outcome {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}

pub struct SessionRedemption {
    config: AppConfig,
}

impl SessionRedemption {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl RedemptionStage for SessionRedemption {
    async fn redeem(&self) -> Result<RedemptionSession> {
        let bridge = connect(&self.config).await?;
        let stage = BrowserRedemptionStage::new(Arc::clone(&bridge), &self.config);
        closing_after(stage.redeem(), bridge.close()).await
    }
}

pub struct SessionPurchase {
    config: AppConfig,
}

impl SessionPurchase {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl PurchaseStage for SessionPurchase {
    async fn purchase(&self) -> Result<PurchaseSession> {
        let bridge = connect(&self.config).await?;
        let stage = BrowserPurchaseStage::new(Arc::clone(&bridge), &self.config);
        closing_after(stage.purchase(), bridge.close()).await
    }
}
