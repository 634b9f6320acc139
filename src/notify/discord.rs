use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Ack, Destination, PublishError};
use crate::event::OutboundMessage;

/// Discord caps plain `content` at 2000 chars.
const DISCORD_CONTENT_LIMIT: usize = 2000;

#[derive(Clone)]
pub struct DiscordDestination {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordDestination {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

/// 500ms, 1s, 2s, ...
fn backoff(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << (attempt.saturating_sub(1)).min(6))
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
}

impl DiscordWebhookPayload {
    fn from_message(msg: &OutboundMessage) -> Self {
        let content = if msg.content.chars().count() > DISCORD_CONTENT_LIMIT {
            let mut s: String = msg.content.chars().take(DISCORD_CONTENT_LIMIT - 1).collect();
            s.push('…');
            s
        } else {
            msg.content.clone()
        };
        Self { content }
    }
}

#[async_trait]
impl Destination for DiscordDestination {
    fn name(&self) -> &str {
        "discord"
    }

    async fn publish(&self, msg: &OutboundMessage) -> Result<Ack, PublishError> {
        let payload = DiscordWebhookPayload::from_message(msg);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(Ack::default()),
                    Err(e) => PublishError::Rejected(e.without_url().to_string()),
                },
                Err(e) if e.is_connect() => PublishError::Connect(e.without_url().to_string()),
                Err(e) => PublishError::Transport(e.without_url().to_string()),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "notify", attempt, error = %err, "discord webhook retry");
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}
