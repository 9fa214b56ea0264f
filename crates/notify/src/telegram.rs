use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::notifier::{Notifier, NotifyError};

/// Telegram Bot API `sendMessage` client.
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: SecretString,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString, api_base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), bot_token, api_base_url: api_base_url.into() }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base_url.trim_end_matches('/'),
            self.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.send_message_url())
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let body: ApiResponse =
            response.json().await.map_err(|e| NotifyError::Transport(e.to_string()))?;
        if !body.ok {
            return Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| "no description".to_owned()),
            ));
        }
        Ok(())
    }
}
