use chrono::Utc;
use dual_invest_core::{
    AppConfig, FailureReason, Notifier, PurchaseSession, PurchaseStage, RedemptionSession,
    RedemptionStage, ReportFormatter, RunReport,
};
use futures::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{interval, interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// How often the idle loop logs that it is still alive.
pub const LIVENESS_CHECK: Duration = Duration::from_secs(60);

/// Runs redemption then purchase once at startup and then on a fixed interval.
///
/// A run is awaited to completion before the loop looks at the timer or the
/// shutdown signal again, so runs never overlap and an interrupt only takes
/// effect between runs.
pub struct RunScheduler {
    redemption: Arc<dyn RedemptionStage>,
    purchase: Arc<dyn PurchaseStage>,
    notifier: Arc<dyn Notifier>,
    interval_minutes: u64,
    fallback_amount: Decimal,
    currency: String,
    product_side: String,
}

impl RunScheduler {
    #[must_use]
    pub fn new(
        redemption: Arc<dyn RedemptionStage>,
        purchase: Arc<dyn PurchaseStage>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        Self {
            redemption,
            purchase,
            notifier,
            interval_minutes: config.schedule.interval_minutes,
            fallback_amount: config.invest.investment_amount,
            currency: config.invest.currency.clone(),
            product_side: config.invest.product_side.clone(),
        }
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> u64 {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until `shutdown` completes and returns the number of runs executed.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_secs(self.interval_minutes.max(1) * 60);
        info!(
            interval_minutes = self.interval_minutes,
            amount = %self.fallback_amount,
            currency = %self.currency,
            "Scheduler started"
        );
        self.notify(&ReportFormatter::format_startup(
            self.interval_minutes,
            self.fallback_amount,
            &self.currency,
        ))
        .await;

        // The first tick completes immediately, which gives the startup run.
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut liveness = interval_at(Instant::now() + LIVENESS_CHECK, LIVENESS_CHECK);

        tokio::pin!(shutdown);
        let mut runs = 0u64;

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    runs += 1;
                    info!(run = runs, "Starting scheduled run");
                    self.guarded_tick().await;
                    info!(
                        run = runs,
                        next_in_minutes = self.interval_minutes,
                        "Run finished"
                    );
                }
                _ = liveness.tick() => {
                    debug!(runs, "Scheduler alive, waiting for next run");
                }
            }
        }

        self.notify(&ReportFormatter::format_shutdown(runs)).await;
        info!(runs, "Scheduler stopped");
        runs
    }

    /// Executes one run: redemption, then purchase, then the report.
    ///
    /// A fault in either stage is folded into that stage's session so the
    /// other stage and the report still happen.
    pub async fn run_tick(&self) -> RunReport {
        let start_time = Utc::now();

        info!("Stage 1: redemption");
        let redemption = self.run_redemption().await;

        info!("Stage 2: purchase");
        let purchase = self.run_purchase().await;

        let report = RunReport::new(start_time, Utc::now(), redemption, purchase);
        info!(
            overall = ?report.overall_status,
            redemption = ?report.redemption.status(),
            purchase = ?report.purchase.status(),
            duration_ms = report.duration().num_milliseconds(),
            "Run complete"
        );

        self.notify(&ReportFormatter::format(&report)).await;
        report
    }

    async fn guarded_tick(&self) {
        if let Err(payload) = AssertUnwindSafe(self.run_tick()).catch_unwind().await {
            let message = panic_message(payload.as_ref());
            error!(error = %message, "Run crashed");
            self.notify(&ReportFormatter::format_fault(&message)).await;
        }
    }

    async fn run_redemption(&self) -> RedemptionSession {
        let outcome = AssertUnwindSafe(self.redemption.redeem()).catch_unwind().await;
        let fault = match outcome {
            Ok(Ok(session)) => return session,
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(error = %fault, "Redemption stage fault");
        let mut session = RedemptionSession::new(self.fallback_amount, &self.currency);
        session.fail(FailureReason::Fault(fault));
        session
    }

    async fn run_purchase(&self) -> PurchaseSession {
        let outcome = AssertUnwindSafe(self.purchase.purchase()).catch_unwind().await;
        let fault = match outcome {
            Ok(Ok(session)) => return session,
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(error = %fault, "Purchase stage fault");
        let mut session =
            PurchaseSession::new(self.fallback_amount, &self.currency, &self.product_side);
        session.fail(FailureReason::Fault(fault));
        session
    }

    async fn notify(&self, text: &str) {
        if !self.notifier.send(text).await {
            warn!("Notification was not delivered");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Completes on Ctrl+C, or on SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
