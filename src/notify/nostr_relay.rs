// src/notify/nostr_relay.rs
//! Nostr relay over websocket: `["EVENT", ev]` out, `["OK", id, bool, msg]` back.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use super::{Ack, Destination, PublishError};
use crate::event::OutboundMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayReply {
    Ok { accepted: bool, message: String },
    Notice(String),
    /// Anything else, including an OK for a different event.
    Other,
}

/// Classify one relay text frame relative to the event we are waiting on.
pub fn parse_relay_reply(frame: &str, event_id: &str) -> RelayReply {
    let Ok(Value::Array(parts)) = serde_json::from_str::<Value>(frame) else {
        return RelayReply::Other;
    };
    match parts.first().and_then(Value::as_str) {
        Some("OK") if parts.get(1).and_then(Value::as_str) == Some(event_id) => RelayReply::Ok {
            accepted: parts.get(2).and_then(Value::as_bool).unwrap_or(false),
            message: parts
                .get(3)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        Some("NOTICE") => RelayReply::Notice(
            parts
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        _ => RelayReply::Other,
    }
}

async fn wait_for_ok<S>(stream: &mut S, event_id: &str) -> Result<Ack, PublishError>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| PublishError::Transport(e.to_string()))?;
        match frame {
            WsMessage::Text(text) => match parse_relay_reply(&text, event_id) {
                RelayReply::Ok { accepted: true, message } => {
                    return Ok(Ack {
                        detail: (!message.is_empty()).then_some(message),
                    })
                }
                RelayReply::Ok { accepted: false, message } => {
                    return Err(PublishError::Rejected(message))
                }
                RelayReply::Notice(n) => {
                    tracing::debug!(target: "notify", notice = %n, "relay notice");
                }
                RelayReply::Other => {}
            },
            WsMessage::Close(_) => {
                return Err(PublishError::Transport(
                    "relay closed the connection before OK".into(),
                ))
            }
            _ => {}
        }
    }
    Err(PublishError::Transport("relay stream ended before OK".into()))
}

pub struct NostrRelayDestination {
    url: String,
    ack_timeout: Duration,
}

impl NostrRelayDestination {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ack_timeout: Duration::from_secs(8),
        }
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }
}

#[async_trait]
impl Destination for NostrRelayDestination {
    fn name(&self) -> &str {
        &self.url
    }

    async fn publish(&self, msg: &OutboundMessage) -> Result<Ack, PublishError> {
        let ev = msg.nostr.as_ref().ok_or(PublishError::Unsigned)?;

        let (mut ws, _resp) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| PublishError::Connect(e.to_string()))?;

        let frame = serde_json::json!(["EVENT", ev]).to_string();
        ws.send(WsMessage::Text(frame))
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let outcome = tokio::time::timeout(self.ack_timeout, wait_for_ok(&mut ws, &ev.id)).await;
        // Best effort; the verdict is already in.
        let _ = ws.close(None).await;

        match outcome {
            Ok(res) => res,
            Err(_) => Err(PublishError::Timeout(self.ack_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn ok_frames_are_matched_by_event_id() {
        assert_eq!(
            parse_relay_reply(r#"["OK","abc",true,""]"#, "abc"),
            RelayReply::Ok {
                accepted: true,
                message: String::new()
            }
        );
        assert_eq!(
            parse_relay_reply(r#"["OK","abc",false,"rate-limited: slow down"]"#, "abc"),
            RelayReply::Ok {
                accepted: false,
                message: "rate-limited: slow down".into()
            }
        );
        assert_eq!(
            parse_relay_reply(r#"["OK","other",true,""]"#, "abc"),
            RelayReply::Other
        );
        assert_eq!(
            parse_relay_reply(r#"["NOTICE","hi"]"#, "abc"),
            RelayReply::Notice("hi".into())
        );
        assert_eq!(parse_relay_reply("not json", "abc"), RelayReply::Other);
    }

    #[tokio::test]
    async fn waits_past_notices_for_its_ok() {
        let frames = vec![
            Ok(WsMessage::Text(r#"["NOTICE","welcome"]"#.into())),
            Ok(WsMessage::Text(r#"["OK","zzz",true,""]"#.into())),
            Ok(WsMessage::Text(r#"["OK","abc",true,"duplicate: already have it"]"#.into())),
        ];
        let mut s = stream::iter(frames);
        let ack = wait_for_ok(&mut s, "abc").await.unwrap();
        assert_eq!(ack.detail.as_deref(), Some("duplicate: already have it"));
    }

    #[tokio::test]
    async fn rejection_and_early_close_are_errors() {
        let mut s = stream::iter(vec![Ok(WsMessage::Text(
            r#"["OK","abc",false,"blocked: pubkey not allowed"]"#.into(),
        ))]);
        assert_eq!(
            wait_for_ok(&mut s, "abc").await,
            Err(PublishError::Rejected("blocked: pubkey not allowed".into()))
        );

        let mut closed = stream::iter(vec![Ok(WsMessage::Close(None))]);
        assert!(matches!(
            wait_for_ok(&mut closed, "abc").await,
            Err(PublishError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn unsigned_message_is_refused_before_connecting() {
        use crate::identity::RepositoryIdentity;
        let relay = NostrRelayDestination::new("wss://127.0.0.1:1".into());
        let msg = OutboundMessage {
            identity: RepositoryIdentity::parse("a/b").unwrap(),
            url: "https://github.com/a/b".into(),
            content: "x".into(),
            nostr: None,
        };
        assert_eq!(relay.publish(&msg).await, Err(PublishError::Unsigned));
    }
}
