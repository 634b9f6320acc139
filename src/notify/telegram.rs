// src/notify/telegram.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Ack, Destination, PublishError};
use crate::event::OutboundMessage;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Thin Bot API client; only `sendMessage` is needed.
#[derive(Clone)]
pub struct TelegramBot {
    api_base: String,
    token: String,
    client: Client,
}

impl TelegramBot {
    pub fn new(api_base: String, token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_base,
            token,
            client,
        }
    }

    pub fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }

    /// Post `text` to `chat_id`; returns the raw response body.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<String, PublishError> {
        let chat = chat_id.to_string();
        let resp = self
            .client
            .post(self.send_message_url())
            .form(&[("chat_id", chat.as_str()), ("text", text)])
            .send()
            .await
            // The URL embeds the bot token; keep it out of errors and logs.
            .map_err(|e| PublishError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PublishError::Transport(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected(format!("telegram {status}: {body}")));
        }
        tracing::debug!(target: "notify", chat_id, "telegram message delivered");
        Ok(body)
    }
}

pub struct TelegramDestination {
    bot: TelegramBot,
    chat_id: i64,
    label: String,
}

impl TelegramDestination {
    pub fn new(bot: TelegramBot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id,
            label: format!("telegram:{chat_id}"),
        }
    }
}

#[async_trait]
impl Destination for TelegramDestination {
    fn name(&self) -> &str {
        &self.label
    }

    async fn publish(&self, msg: &OutboundMessage) -> Result<Ack, PublishError> {
        self.bot.send_text(self.chat_id, &msg.content).await?;
        Ok(Ack::default())
    }
}
