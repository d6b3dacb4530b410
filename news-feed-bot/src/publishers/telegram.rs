use crate::traits::ChannelPublisher;
use crate::types::{BotError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Posts MarkdownV2 messages to one Telegram chat through the Bot API.
pub struct TelegramPublisher {
    client: reqwest::Client,
    bot_token: String,
    chat_id: i64,
    base_url: String,
}

impl TelegramPublisher {
    pub fn new(client: reqwest::Client, bot_token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            chat_id,
            base_url: TELEGRAM_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ChannelPublisher for TelegramPublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);

        debug!(chat_id = self.chat_id, "Sending message to Telegram");

        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
                "parse_mode": "MarkdownV2",
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(BotError::Telegram(format!("{}: {}", status, error_text)));
        }

        Ok(())
    }
}
