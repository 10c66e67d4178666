use super::{SessionPurchase, SessionRedemption};
use anyhow::Result;
use dual_invest_core::{AppConfig, PurchaseStage, RedemptionStage, ReportFormatter};
use dual_invest_scheduler::RunScheduler;
use std::sync::Arc;

fn scheduler(config: &AppConfig) -> RunScheduler {
    RunScheduler::new(
        Arc::new(SessionRedemption::new(config)),
        Arc::new(SessionPurchase::new(config)),
        dual_invest_notifier::from_config(&config.telegram),
        config,
    )
}

/// Runs the scheduler until Ctrl+C or SIGTERM.
pub async fn run_daemon(config: &AppConfig) -> Result<()> {
    tracing::info!(
        interval_minutes = config.schedule.interval_minutes,
        pair = %config.invest.product_pair,
        side = %config.invest.product_side,
        "Starting dual-invest daemon"
    );
    tracing::info!("Press Ctrl+C to stop");

    let runs = scheduler(config).run().await;

    tracing::info!(runs, "Dual-invest daemon stopped");
    Ok(())
}

/// One run, reported like a scheduled one.
pub async fn run_once(config: &AppConfig) -> Result<()> {
    let report = scheduler(config).run_tick().await;

    println!("{}", ReportFormatter::format(&report));
    Ok(())
}

/// Redemption stage only. No notification is sent.
pub async fn run_redeem(config: &AppConfig) -> Result<()> {
    let session = SessionRedemption::new(config).redeem().await?;

    println!("{}", ReportFormatter::format_redemption(&session));
    Ok(())
}

/// Purchase stage only. No notification is sent.
pub async fn run_purchase(config: &AppConfig) -> Result<()> {
    let session = SessionPurchase::new(config).purchase().await?;

    println!("{}", ReportFormatter::format_purchase(&session));
    Ok(())
}
