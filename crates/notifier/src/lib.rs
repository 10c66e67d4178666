//! Delivery of run reports and lifecycle messages.

pub mod log_notifier;
pub mod telegram;

pub use log_notifier::LogNotifier;
pub use telegram::{NotifierError, TelegramNotifier};

use dual_invest_core::{Notifier, TelegramConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Telegram when it is enabled and configured, otherwise the log.
#[must_use]
pub fn from_config(config: &TelegramConfig) -> Arc<dyn Notifier> {
    if !config.enabled {
        info!("Telegram notifications disabled, reports go to the log");
        return Arc::new(LogNotifier);
    }
    if config.bot_token.is_empty() || config.chat_id.is_empty() {
        warn!("Telegram enabled without bot token or chat id, reports go to the log");
        return Arc::new(LogNotifier);
    }
    info!("Telegram notifications enabled");
    Arc::new(TelegramNotifier::new(
        &config.api_url,
        &config.bot_token,
        &config.chat_id,
    ))
}
