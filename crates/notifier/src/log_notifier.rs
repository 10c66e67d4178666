use async_trait::async_trait;
use dual_invest_core::Notifier;
use tracing::info;

/// Writes messages to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> bool {
        info!(target: "notification", "\n{text}");
        true
    }
}
