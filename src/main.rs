//! Telegram bot service: answers `/webhook/telegram` with trending listings.
//! The scheduled announcement run lives in `bin/publish_trending.rs`.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use trending_relay::api::{self, AppState};
use trending_relay::config;
use trending_relay::logging::init_tracing;
use trending_relay::metrics::Metrics;
use trending_relay::notify::TelegramBot;
use trending_relay::source::GithubSearchSource;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default()?;
    let telegram = cfg
        .telegram
        .as_ref()
        .context("GITHUB_BOT_TOKEN is required to answer webhooks")?;

    let search = GithubSearchSource::new(cfg.source.search_api_url.clone())
        .context("github search source")?;
    let bot = TelegramBot::new(telegram.api_base.clone(), telegram.token.expose().to_string());

    let metrics = Metrics::init(cfg.rate_interval_ms, cfg.seen_ttl_secs)?;

    let state = AppState {
        search: Arc::new(search),
        replier: Arc::new(bot),
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
