//! Telegram Bot API notifications.
//!
//! Messages are sent with Markdown parse mode through `sendMessage`.

use async_trait::async_trait;
use dual_invest_core::Notifier;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("telegram rejected message: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(api_url: &str, bot_token: &str, chat_id: &str) -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }

    /// Sends `text` to the configured chat.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success HTTP status, or
    /// when the API answers with `ok: false`.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifierError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self.client.post(self.endpoint()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ApiResponse = response.json().await?;
        if !parsed.ok {
            return Err(NotifierError::Rejected(
                parsed.description.unwrap_or_default(),
            ));
        }

        debug!("Telegram notification sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        match self.send_message(text).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Telegram notification failed");
                false
            }
        }
    }
}
