// src/bootstrap.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{PublisherConfig, SourceKind};
use crate::event::NostrSigner;
use crate::fanout::{PublishSettings, Publisher, PublisherDeps, RunError, RunReport};
use crate::limiter::RateLimiter;
use crate::notify::destinations_from_config;
use crate::render::TextRenderer;
use crate::seen::{MemorySeenStore, RedisSeenStore, RedisStoreConfig, SeenStore};
use crate::source::{CandidateSource, GithubSearchSource, SourceQuery, TrendingPageSource};

/// Everything a publish run needs, wired from one `PublisherConfig`.
pub struct PublisherRuntime {
    pub cfg: PublisherConfig,
    pub source: Arc<dyn CandidateSource>,
    pub query: SourceQuery,
    pub publisher: Publisher,
}

impl PublisherRuntime {
    pub async fn from_config(cfg: PublisherConfig) -> Result<Self> {
        cfg.validate_for_publishing()?;
        // Safe diagnostics only: counts and flags, never secrets.
        info!(
            relays = cfg.relays.len(),
            telegram = cfg.telegram.as_ref().is_some_and(|t| t.chat_id.is_some()),
            discord = cfg.discord_webhook.is_some(),
            redis = cfg.store.address.is_some(),
            "publisher cfg loaded"
        );

        let seen = build_store(&cfg).await?;
        let source = build_source(&cfg)?;
        let signer = cfg
            .secret_key_hex
            .as_ref()
            .filter(|k| !k.is_empty())
            .map(|k| NostrSigner::from_hex(k.expose()))
            .transpose()
            .context("NOSTR_HEX_SK")?
            .map(Arc::new);
        if let Some(s) = &signer {
            info!(pubkey = s.public_key_hex(), "nostr signer ready");
        }

        let deps = PublisherDeps {
            seen,
            limiter: Arc::new(RateLimiter::new(cfg.rate_interval())),
            renderer: Arc::new(TextRenderer::default()),
            destinations: destinations_from_config(&cfg),
            signer,
        };
        let settings = PublishSettings {
            batch_cap: cfg.batch_cap,
            seen_ttl: cfg.seen_ttl(),
            publish_timeout: cfg.publish_timeout(),
        };
        let query = SourceQuery::new(cfg.source.window, cfg.source.language.clone());

        Ok(Self {
            publisher: Publisher::new(deps, settings),
            source,
            query,
            cfg,
        })
    }

    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunReport, RunError> {
        self.publisher
            .run_from_source(self.source.as_ref(), &self.query, cancel)
            .await
    }
}

async fn build_store(cfg: &PublisherConfig) -> Result<Arc<dyn SeenStore>> {
    let Some(address) = cfg.store.address.clone() else {
        warn!(target: "seen", "no REDIS_HOST configured, dedup is process-local");
        return Ok(Arc::new(MemorySeenStore::new()));
    };
    let store = RedisSeenStore::connect(RedisStoreConfig {
        address,
        password: cfg.store.password.as_ref().map(|p| p.expose().to_string()),
        key_prefix: cfg.store.key_prefix.clone(),
        op_timeout: cfg.store_op_timeout(),
    })
    .await
    .context("connecting seen-set store")?;
    Ok(Arc::new(store))
}

/// Candidate source for the configured kind.
pub fn build_source(cfg: &PublisherConfig) -> Result<Arc<dyn CandidateSource>> {
    let source: Arc<dyn CandidateSource> = match cfg.source.kind {
        SourceKind::Trending => Arc::new(
            TrendingPageSource::from_base_url(&cfg.source.trending_base_url)
                .context("trending page source")?,
        ),
        SourceKind::Search => Arc::new(
            GithubSearchSource::new(cfg.source.search_api_url.clone())
                .context("github search source")?,
        ),
    };
    Ok(source)
}
