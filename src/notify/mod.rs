// src/notify/mod.rs
//! Destination endpoints: anything that can take a published announcement.

pub mod discord;
pub mod nostr_relay;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::PublisherConfig;
use crate::event::OutboundMessage;

pub use discord::DiscordDestination;
pub use nostr_relay::NostrRelayDestination;
pub use telegram::{TelegramBot, TelegramDestination};

/// Positive acknowledgement from an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("endpoint rejected the message: {0}")]
    Rejected(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("message carries no signed event")]
    Unsigned,
}

#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    /// Stable label used in logs, metrics and run reports.
    fn name(&self) -> &str;

    async fn publish(&self, msg: &OutboundMessage) -> Result<Ack, PublishError>;
}

/// Build every destination the configuration enables, relays first.
pub fn destinations_from_config(cfg: &PublisherConfig) -> Vec<Arc<dyn Destination>> {
    let mut out: Vec<Arc<dyn Destination>> = Vec::new();

    for relay in &cfg.relays {
        out.push(Arc::new(NostrRelayDestination::new(relay.clone())));
    }

    if let Some(tg) = &cfg.telegram {
        if let Some(chat_id) = tg.chat_id {
            let bot = TelegramBot::new(tg.api_base.clone(), tg.token.expose().to_string());
            out.push(Arc::new(TelegramDestination::new(bot, chat_id)));
        }
    }

    if let Some(webhook) = cfg.discord_webhook.as_ref().filter(|w| !w.is_empty()) {
        out.push(Arc::new(DiscordDestination::new(webhook.clone())));
    }

    if out.is_empty() {
        tracing::warn!(target: "notify", "no destinations configured");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Secret, TelegramConfig};

    #[test]
    fn builds_relays_then_chats() {
        let cfg = PublisherConfig {
            relays: vec!["wss://relay.one".into(), "wss://relay.two".into()],
            telegram: Some(TelegramConfig {
                token: Secret::new("t"),
                chat_id: Some(42),
                api_base: "https://api.telegram.org".into(),
            }),
            discord_webhook: Some("https://discord.test/hook".into()),
            ..PublisherConfig::default()
        };
        let names: Vec<String> = destinations_from_config(&cfg)
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "wss://relay.one",
                "wss://relay.two",
                "telegram:42",
                "discord"
            ]
        );
    }
}
