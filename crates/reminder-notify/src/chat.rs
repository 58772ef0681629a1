//! Telegram Bot API transport.

use std::time::Duration;

use async_trait::async_trait;
use reminder_types::{Notifier, Reminder, User};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::format::chat_text;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Upper bound on one `sendMessage` call, connect included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
enum ChatError {
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    #[error("api returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: serde_json::Value,
    },

    #[error("api rejected message: {0}")]
    Rejected(String),
}

pub struct TelegramNotifier {
    bot_token: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// `None` for the token disables the transport.
    pub fn new(bot_token: Option<String>, api_url: impl Into<String>) -> Self {
        Self::with_timeout(bot_token, api_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        bot_token: Option<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("chat client without timeout: {}", e.without_url());
                reqwest::Client::new()
            });
        Self {
            bot_token,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn send_message(&self, token: &str, chat_id: &str, text: String) -> Result<(), ChatError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let body = json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Request(e.without_url()))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatError::Status {
                status,
                body: payload,
            });
        }
        if payload.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
            let description = payload
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("no description");
            return Err(ChatError::Rejected(description.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user: &User, reminder: &Reminder) -> bool {
        let Some(token) = self.bot_token.as_deref() else {
            warn!(reminder_id = %reminder.id, "chat bot token not configured");
            return false;
        };
        let Some(chat_id) = user.chat_id.as_deref() else {
            warn!(reminder_id = %reminder.id, user_id = %user.id, "user has no chat id");
            return false;
        };

        match self.send_message(token, chat_id, chat_text(reminder)).await {
            Ok(()) => {
                info!(reminder_id = %reminder.id, chat_id, "chat message sent");
                true
            }
            Err(e) => {
                warn!(reminder_id = %reminder.id, "chat delivery failed: {}", e);
                false
            }
        }
    }
}
