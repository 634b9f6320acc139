use std::sync::Arc;

use async_trait::async_trait;
use shuttle_axum::axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::notify::{PublishError, TelegramBot};
use crate::render::render_listing;
use crate::source::{CandidateSource, SourceQuery, TimeWindow};

const START_COMMAND: &str = "/start";
const USAGE: &str = "Send a language name (e.g. `rust`) to get its trending repositories.";

/// Sends a text reply back to a chat.
#[async_trait]
pub trait ChatReply: Send + Sync {
    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), PublishError>;
}

#[async_trait]
impl ChatReply for TelegramBot {
    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), PublishError> {
        self.send_text(chat_id, text).await.map(|_| ())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<dyn CandidateSource>,
    pub replier: Arc<dyn ChatReply>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/webhook/telegram", post(telegram_webhook))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, serde::Deserialize)]
struct Message {
    #[serde(default)]
    text: String,
    chat: Chat,
}

#[derive(Debug, serde::Deserialize)]
struct Update {
    #[allow(dead_code)]
    update_id: i64,
    /// Absent for edits, callbacks and other update kinds we ignore.
    message: Option<Message>,
}

/// Drop a leading `/start` and surrounding whitespace.
pub fn sanitize(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(START_COMMAND).unwrap_or(text).trim()
}

/// Telegram retries anything but 2xx, so only an unparsable body gets an error status.
async fn telegram_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            warn!(target: "api", error = %e, "could not decode incoming update");
            return StatusCode::BAD_REQUEST;
        }
    };
    let Some(message) = update.message else {
        return StatusCode::OK;
    };
    let chat_id = message.chat.id;
    let term = sanitize(&message.text);

    let reply = if term.is_empty() {
        USAGE.to_string()
    } else {
        let query = SourceQuery::new(TimeWindow::Daily, term);
        match state.search.fetch_trending(&query).await {
            Ok(items) => render_listing(&items),
            Err(e) => {
                warn!(target: "api", chat_id, language = term, error = %e, "search failed");
                return StatusCode::OK;
            }
        }
    };

    match state.replier.reply(chat_id, &reply).await {
        Ok(()) => info!(target: "api", chat_id, "reply sent"),
        Err(e) => warn!(target: "api", chat_id, error = %e, "reply failed"),
    }
    StatusCode::OK
}
