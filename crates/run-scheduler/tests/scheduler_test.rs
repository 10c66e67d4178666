use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dual_invest_core::{
    AppConfig, FailureReason, FundingSource, Notifier, OverallStatus, Product, PurchaseSession,
    PurchaseStage, RedemptionSession, RedemptionStage, SessionStatus,
};
use dual_invest_scheduler::RunScheduler;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum Behavior {
    Succeed,
    Fail(FailureReason),
    Error(&'static str),
    Panic,
}

struct ScriptedRedemption {
    behavior: Behavior,
    calls: AtomicUsize,
}

#[async_trait]
impl RedemptionStage for ScriptedRedemption {
    async fn redeem(&self) -> Result<RedemptionSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut session = RedemptionSession::new(dec!(20), "USDT");
        match &self.behavior {
            Behavior::Succeed => {
                session.adjusted_target = Some(20);
                session.record_redeemed(FundingSource {
                    amount: dec!(12),
                    index: 0,
                });
                session.record_redeemed(FundingSource {
                    amount: dec!(9),
                    index: 1,
                });
                session.succeed();
            }
            Behavior::Fail(reason) => {
                session.fail(reason.clone());
            }
            Behavior::Error(msg) => return Err(anyhow!(*msg)),
            Behavior::Panic => panic!("redemption exploded"),
        }
        Ok(session)
    }
}

struct ScriptedPurchase {
    behavior: Behavior,
    calls: AtomicUsize,
}

#[async_trait]
impl PurchaseStage for ScriptedPurchase {
    async fn purchase(&self) -> Result<PurchaseSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut session = PurchaseSession::new(dec!(20), "USDT", "Buy Low");
        match &self.behavior {
            Behavior::Succeed => {
                session.select(Product {
                    index: 1,
                    displayed_price: "2,450".to_string(),
                    price_offset: "-1.8%".to_string(),
                    settlement_date: "2025-06-01 16:00".to_string(),
                    duration: "1 Day".to_string(),
                    apr: "85.2%".to_string(),
                    is_vip: false,
                });
                session.succeed();
            }
            Behavior::Fail(reason) => {
                session.fail(reason.clone());
            }
            Behavior::Error(msg) => return Err(anyhow!(*msg)),
            Behavior::Panic => panic!("purchase exploded"),
        }
        Ok(session)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    reject: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> bool {
        self.messages.lock().push(text.to_string());
        !self.reject
    }
}

struct Harness {
    scheduler: RunScheduler,
    redemption: Arc<ScriptedRedemption>,
    purchase: Arc<ScriptedPurchase>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(redeem: Behavior, purchase: Behavior) -> Harness {
    let redemption = Arc::new(ScriptedRedemption {
        behavior: redeem,
        calls: AtomicUsize::new(0),
    });
    let purchase = Arc::new(ScriptedPurchase {
        behavior: purchase,
        calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = RunScheduler::new(
        redemption.clone(),
        purchase.clone(),
        notifier.clone(),
        &AppConfig::default(),
    );
    Harness {
        scheduler,
        redemption,
        purchase,
        notifier,
    }
}

#[tokio::test]
async fn test_redemption_failure_gives_partial_report() {
    let h = harness(
        Behavior::Fail(FailureReason::InsufficientFunds {
            available: dec!(18),
            required: dec!(20),
        }),
        Behavior::Succeed,
    );

    let report = h.scheduler.run_tick().await;

    assert_eq!(report.overall_status, OverallStatus::Partial);
    assert_eq!(h.purchase.calls.load(Ordering::SeqCst), 1);

    let messages = h.notifier.messages.lock();
    assert_eq!(messages.len(), 1);
    let text = &messages[0];
    assert!(text.contains("insufficient funds: 18 available"));
    assert!(text.contains("Amount: 20 USDT"));
    assert!(text.contains("Strike: 2,450 (-1.8%)"));
}

#[tokio::test]
async fn test_both_stages_succeed() {
    let h = harness(Behavior::Succeed, Behavior::Succeed);

    let report = h.scheduler.run_tick().await;

    assert_eq!(report.overall_status, OverallStatus::Success);
    assert_eq!(report.redemption.total_redeemed, dec!(21));
    assert!(h.notifier.messages.lock()[0].contains("Overall: success"));
}

#[tokio::test]
async fn test_both_stages_fail() {
    let h = harness(
        Behavior::Fail(FailureReason::NoRedeemableSources),
        Behavior::Fail(FailureReason::PriceDriftExhausted { attempts: 3 }),
    );

    let report = h.scheduler.run_tick().await;

    assert_eq!(report.overall_status, OverallStatus::Failed);
    let text = &h.notifier.messages.lock()[0];
    assert!(text.contains("no redeemable positions found"));
    assert!(text.contains("price changed 3 times"));
}

#[tokio::test]
async fn test_stage_error_becomes_fault_and_purchase_still_runs() {
    let h = harness(Behavior::Error("browser session lost"), Behavior::Succeed);

    let report = h.scheduler.run_tick().await;

    assert_eq!(report.redemption.status(), SessionStatus::Failed);
    assert_eq!(
        report.redemption.failure_reason(),
        Some(&FailureReason::Fault("browser session lost".to_string()))
    );
    assert!(report.purchase.is_success());
    assert_eq!(report.overall_status, OverallStatus::Partial);
}

#[tokio::test]
async fn test_stage_panic_is_contained() {
    let h = harness(Behavior::Succeed, Behavior::Panic);

    let report = h.scheduler.run_tick().await;

    assert!(report.redemption.is_success());
    assert_eq!(
        report.purchase.failure_reason(),
        Some(&FailureReason::Fault("purchase exploded".to_string()))
    );
    assert_eq!(report.purchase.investment_amount, dec!(20));
    assert_eq!(report.overall_status, OverallStatus::Partial);
}

#[tokio::test]
async fn test_rejected_notification_does_not_fail_run() {
    let redemption = Arc::new(ScriptedRedemption {
        behavior: Behavior::Succeed,
        calls: AtomicUsize::new(0),
    });
    let purchase = Arc::new(ScriptedPurchase {
        behavior: Behavior::Succeed,
        calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(RecordingNotifier {
        messages: Mutex::new(Vec::new()),
        reject: true,
    });
    let scheduler = RunScheduler::new(redemption, purchase, notifier.clone(), &AppConfig::default());

    let report = scheduler.run_tick().await;

    assert_eq!(report.overall_status, OverallStatus::Success);
    assert_eq!(notifier.messages.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_runs_at_startup_and_every_interval() {
    let h = harness(Behavior::Succeed, Behavior::Succeed);

    // 30 minute default interval: runs at 0, 30 and 60 minutes.
    let runs = h
        .scheduler
        .run_until(tokio::time::sleep(Duration::from_secs(65 * 60)))
        .await;

    assert_eq!(runs, 3);
    assert_eq!(h.redemption.calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.purchase.calls.load(Ordering::SeqCst), 3);

    let messages = h.notifier.messages.lock();
    assert_eq!(messages.len(), 5);
    assert!(messages[0].contains("scheduler started"));
    assert!(messages[4].contains("Runs completed: 3"));
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_faulty_runs() {
    let h = harness(Behavior::Panic, Behavior::Error("page never loaded"));

    let runs = h
        .scheduler
        .run_until(tokio::time::sleep(Duration::from_secs(31 * 60)))
        .await;

    assert_eq!(runs, 2);
    let messages = h.notifier.messages.lock();
    assert!(messages[1].contains("redemption exploded"));
    assert!(messages[1].contains("page never loaded"));
    assert!(messages[1].contains("Overall: failed"));
}

#[tokio::test(start_paused = true)]
async fn test_immediate_shutdown_still_notifies() {
    let h = harness(Behavior::Succeed, Behavior::Succeed);

    let runs = h.scheduler.run_until(async {}).await;

    assert_eq!(runs, 0);
    let messages = h.notifier.messages.lock();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("Runs completed: 0"));
}

/// Redemption whose first run outlasts the interval.
struct SlowRedemption {
    first_run: Duration,
    started: tokio::time::Instant,
    start_minutes: Mutex<Vec<u64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl RedemptionStage for SlowRedemption {
    async fn redeem(&self) -> Result<RedemptionSession> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let first = {
            let mut starts = self.start_minutes.lock();
            starts.push(self.started.elapsed().as_secs() / 60);
            starts.len() == 1
        };
        if first {
            tokio::time::sleep(self.first_run).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut session = RedemptionSession::new(dec!(20), "USDT");
        session.fail(FailureReason::NoRedeemableSources);
        Ok(session)
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlong_run_delays_next_run_without_overlap() {
    let redemption = Arc::new(SlowRedemption {
        first_run: Duration::from_secs(45 * 60),
        started: tokio::time::Instant::now(),
        start_minutes: Mutex::new(Vec::new()),
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });
    let purchase = Arc::new(ScriptedPurchase {
        behavior: Behavior::Succeed,
        calls: AtomicUsize::new(0),
    });
    let scheduler = RunScheduler::new(
        redemption.clone(),
        purchase.clone(),
        Arc::new(RecordingNotifier::default()),
        &AppConfig::default(),
    );

    // The 30 minute tick missed during the first run fires when it ends, and
    // the schedule restarts from there: 0, 45, 75. A bursting schedule would
    // also run at 60 and 90.
    let runs = scheduler
        .run_until(tokio::time::sleep(Duration::from_secs(100 * 60)))
        .await;

    assert_eq!(runs, 3);
    assert_eq!(*redemption.start_minutes.lock(), vec![0, 45, 75]);
    assert_eq!(redemption.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(purchase.calls.load(Ordering::SeqCst), 3);
}
