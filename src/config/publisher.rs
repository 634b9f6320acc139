// src/config/publisher.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::Secret;
use crate::notify::telegram::DEFAULT_API_BASE;
use crate::source::{github_search, trending_page, TimeWindow};

pub const ENV_CONFIG_PATH: &str = "PUBLISHER_CONFIG_PATH";

const DEFAULT_TOML_PATH: &str = "config/publisher.toml";
const DEFAULT_JSON_PATH: &str = "config/publisher.json";

/// 36h: long enough that a repo trending two days in a row is announced once.
const DEFAULT_SEEN_TTL_SECS: u64 = 36 * 3600;
/// Most relays enforce strict per-source pacing.
const DEFAULT_RATE_INTERVAL_MS: u64 = 6_000;
const DEFAULT_BATCH_CAP: usize = 10;
const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 10;

fn default_relays() -> Vec<String> {
    vec![
        "wss://nostr.danvergara.com".to_string(),
        "wss://relay.damus.io/".to_string(),
        "wss://relay.nostr.band".to_string(),
    ]
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: Secret,
    /// Channel to announce into; without it the bot only answers webhooks.
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Trending,
    Search,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trending" => Ok(SourceKind::Trending),
            "search" => Ok(SourceKind::Search),
            other => Err(anyhow!("unknown source kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub window: TimeWindow,
    pub language: String,
    pub trending_base_url: String,
    pub search_api_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Trending,
            window: TimeWindow::Daily,
            language: "Go".to_string(),
            trending_base_url: trending_page::DEFAULT_BASE_URL.to_string(),
            search_api_url: github_search::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `host:port` or `redis://` URL. `None` keeps the seen-set in memory.
    pub address: Option<String>,
    pub password: Option<Secret>,
    pub key_prefix: String,
    pub op_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: None,
            password: None,
            key_prefix: String::new(),
            op_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Hex secp256k1 secret used to sign relay events.
    pub secret_key_hex: Option<Secret>,
    pub relays: Vec<String>,
    pub telegram: Option<TelegramConfig>,
    pub discord_webhook: Option<String>,
    pub seen_ttl_secs: u64,
    /// 0 disables pacing.
    pub rate_interval_ms: u64,
    pub batch_cap: usize,
    pub publish_timeout_secs: u64,
    pub store: StoreConfig,
    pub source: SourceConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            secret_key_hex: None,
            relays: default_relays(),
            telegram: None,
            discord_webhook: None,
            seen_ttl_secs: DEFAULT_SEEN_TTL_SECS,
            rate_interval_ms: DEFAULT_RATE_INTERVAL_MS,
            batch_cap: DEFAULT_BATCH_CAP,
            publish_timeout_secs: DEFAULT_PUBLISH_TIMEOUT_SECS,
            store: StoreConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("invalid {name}={raw:?}: {e}"))
}

impl PublisherConfig {
    pub fn seen_ttl(&self) -> Duration {
        Duration::from_secs(self.seen_ttl_secs)
    }

    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    pub fn store_op_timeout(&self) -> Duration {
        Duration::from_millis(self.store.op_timeout_ms)
    }

    /// Overlay process environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|k| std::env::var(k).ok())
    }

    /// Overlay values from `get` (env-like lookup). Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NOSTR_HEX_SK") {
            self.secret_key_hex = Some(Secret::new(v.trim()));
        }
        if let Some(v) = get("NOSTR_RELAYS") {
            self.relays = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("REDIS_HOST") {
            self.store.address = Some(v.trim().to_string());
        }
        if let Some(v) = get("REDIS_PASSWORD") {
            self.store.password = Some(Secret::new(v));
        }
        if let Some(v) = get("SEEN_TTL_SECS") {
            self.seen_ttl_secs = parse_env("SEEN_TTL_SECS", &v)?;
        }
        if let Some(v) = get("RATE_INTERVAL_MS") {
            self.rate_interval_ms = parse_env("RATE_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("BATCH_CAP") {
            self.batch_cap = parse_env("BATCH_CAP", &v)?;
        }
        if let Some(v) = get("PUBLISH_TIMEOUT_SECS") {
            self.publish_timeout_secs = parse_env("PUBLISH_TIMEOUT_SECS", &v)?;
        }
        if let Some(token) = get("GITHUB_BOT_TOKEN") {
            let tg = self.telegram.get_or_insert_with(|| TelegramConfig {
                token: Secret::default(),
                chat_id: None,
                api_base: default_api_base(),
            });
            tg.token = Secret::new(token.trim());
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            let chat_id: i64 = parse_env("TELEGRAM_CHAT_ID", &v)?;
            match self.telegram.as_mut() {
                Some(tg) => tg.chat_id = Some(chat_id),
                None => bail!("TELEGRAM_CHAT_ID is set but no bot token is configured"),
            }
        }
        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.discord_webhook = Some(v.trim().to_string());
        }
        if let Some(v) = get("TRENDING_LANGUAGE") {
            self.source.language = v.trim().to_string();
        }
        if let Some(v) = get("TRENDING_WINDOW") {
            self.source.window = v.parse().map_err(|e| anyhow!("TRENDING_WINDOW: {e}"))?;
        }
        if let Some(v) = get("TRENDING_SOURCE") {
            self.source.kind = v.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.seen_ttl_secs == 0 {
            bail!("seen_ttl_secs must be > 0");
        }
        if self.batch_cap == 0 {
            bail!("batch_cap must be > 0");
        }
        if self.publish_timeout_secs == 0 {
            bail!("publish_timeout_secs must be > 0");
        }
        if self.store.op_timeout_ms == 0 {
            bail!("store.op_timeout_ms must be > 0");
        }
        for relay in &self.relays {
            let url = url::Url::parse(relay).with_context(|| format!("relay url {relay}"))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                bail!("relay url {relay} must use ws:// or wss://");
            }
        }
        if let Some(tg) = &self.telegram {
            if tg.token.is_empty() {
                bail!("telegram section present without a bot token");
            }
        }
        Ok(())
    }

    /// Whether a publish run would reach at least one endpoint.
    pub fn has_destinations(&self) -> bool {
        !self.relays.is_empty()
            || self.telegram.as_ref().is_some_and(|tg| tg.chat_id.is_some())
            || self.discord_webhook.as_ref().is_some_and(|w| !w.is_empty())
    }

    /// Extra checks for a publish run: candidates get marked seen before
    /// fan-out, so a run needs somewhere to publish. Relays only take signed
    /// events.
    pub fn validate_for_publishing(&self) -> Result<()> {
        self.validate()?;
        if !self.has_destinations() {
            bail!("no destinations configured: set NOSTR_RELAYS, TELEGRAM_CHAT_ID or DISCORD_WEBHOOK_URL");
        }
        if !self.relays.is_empty() && self.secret_key_hex.as_ref().map_or(true, Secret::is_empty) {
            bail!("relays are configured but NOSTR_HEX_SK is missing");
        }
        Ok(())
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<PublisherConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading publisher config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, &ext)
        .with_context(|| format!("parsing publisher config {}", path.display()))
}

/// Resolve the config file, then overlay the environment:
/// 1) $PUBLISHER_CONFIG_PATH
/// 2) config/publisher.toml
/// 3) config/publisher.json
/// 4) built-in defaults
pub fn load_default() -> Result<PublisherConfig> {
    let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
        }
        load_from(&pb)?
    } else if Path::new(DEFAULT_TOML_PATH).exists() {
        load_from(Path::new(DEFAULT_TOML_PATH))?
    } else if Path::new(DEFAULT_JSON_PATH).exists() {
        load_from(Path::new(DEFAULT_JSON_PATH))?
    } else {
        PublisherConfig::default()
    };

    cfg.apply_env_overrides()?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PublisherConfig> {
    let looks_json = s.trim_start().starts_with('{');
    if hint_ext == "json" || (hint_ext != "toml" && looks_json) {
        return serde_json::from_str(s).context("json publisher config");
    }
    toml::from_str(s).context("toml publisher config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = PublisherConfig::default();
        assert_eq!(cfg.seen_ttl(), Duration::from_secs(129_600));
        assert_eq!(cfg.rate_interval(), Duration::from_secs(6));
        assert_eq!(cfg.batch_cap, 10);
        assert_eq!(cfg.relays.len(), 3);
    }

    #[test]
    fn toml_and_json_fill_missing_fields_with_defaults() {
        let toml = r#"
batch_cap = 5
relays = ["wss://relay.example"]

[store]
address = "cache:6379"

[source]
language = "Rust"
window = "weekly"
"#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.batch_cap, 5);
        assert_eq!(cfg.store.address.as_deref(), Some("cache:6379"));
        assert_eq!(cfg.source.language, "Rust");
        assert_eq!(cfg.source.window, TimeWindow::Weekly);
        assert_eq!(cfg.seen_ttl_secs, DEFAULT_SEEN_TTL_SECS);

        let json = r#"{"rate_interval_ms": 0, "relays": []}"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(cfg.rate_interval(), Duration::ZERO);
        assert!(cfg.relays.is_empty());
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let vars = env(&[
            ("NOSTR_HEX_SK", " abc "),
            ("NOSTR_RELAYS", "wss://a, ,wss://b"),
            ("REDIS_HOST", "redis:6379"),
            ("SEEN_TTL_SECS", "60"),
            ("BATCH_CAP", ""),
            ("GITHUB_BOT_TOKEN", "123:xyz"),
            ("TELEGRAM_CHAT_ID", "-100200"),
            ("TRENDING_WINDOW", "monthly"),
        ]);
        let mut cfg = PublisherConfig::default();
        cfg.apply_overrides_from(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(cfg.secret_key_hex.as_ref().map(Secret::expose), Some("abc"));
        assert_eq!(cfg.relays, vec!["wss://a".to_string(), "wss://b".to_string()]);
        assert_eq!(cfg.store.address.as_deref(), Some("redis:6379"));
        assert_eq!(cfg.seen_ttl_secs, 60);
        assert_eq!(cfg.batch_cap, DEFAULT_BATCH_CAP);
        let tg = cfg.telegram.as_ref().unwrap();
        assert_eq!(tg.token.expose(), "123:xyz");
        assert_eq!(tg.chat_id, Some(-100200));
        assert_eq!(cfg.source.window, TimeWindow::Monthly);
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let vars = env(&[("RATE_INTERVAL_MS", "soon")]);
        let mut cfg = PublisherConfig::default();
        let err = cfg.apply_overrides_from(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("RATE_INTERVAL_MS"));
    }

    #[test]
    fn chat_id_without_token_is_rejected() {
        let vars = env(&[("TELEGRAM_CHAT_ID", "1")]);
        let mut cfg = PublisherConfig::default();
        assert!(cfg.apply_overrides_from(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn validation_catches_bad_relays_and_missing_key() {
        let mut cfg = PublisherConfig {
            secret_key_hex: Some(Secret::new("k")),
            ..PublisherConfig::default()
        };
        cfg.validate().unwrap();

        cfg.relays = vec!["https://not-a-relay".into()];
        assert!(cfg.validate().is_err());

        cfg.relays = vec!["wss://ok".into()];
        cfg.secret_key_hex = None;
        cfg.validate().unwrap();
        assert!(cfg.validate_for_publishing().is_err());

        cfg.relays.clear();
        cfg.validate().unwrap();

        cfg.batch_cap = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_store_timeout_is_rejected() {
        let mut cfg = PublisherConfig::default();
        cfg.store.op_timeout_ms = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("op_timeout_ms"), "{err}");

        cfg.store.op_timeout_ms = 1;
        cfg.validate().unwrap();
    }

    #[test]
    fn publishing_needs_at_least_one_destination() {
        let mut cfg = PublisherConfig {
            relays: Vec::new(),
            ..PublisherConfig::default()
        };
        assert!(!cfg.has_destinations());
        cfg.validate().unwrap();
        let err = cfg.validate_for_publishing().unwrap_err();
        assert!(err.to_string().contains("no destinations"), "{err}");

        // a bot token without a chat id only serves the webhook
        cfg.telegram = Some(TelegramConfig {
            token: Secret::new("bot-token"),
            chat_id: None,
            api_base: default_api_base(),
        });
        cfg.discord_webhook = Some(String::new());
        assert!(cfg.validate_for_publishing().is_err());

        cfg.discord_webhook = Some("https://discord.example/api/webhooks/1/x".into());
        assert!(cfg.has_destinations());
        cfg.validate_for_publishing().unwrap();

        cfg.discord_webhook = None;
        if let Some(tg) = cfg.telegram.as_mut() {
            tg.chat_id = Some(-100);
        }
        cfg.validate_for_publishing().unwrap();
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = PublisherConfig {
            secret_key_hex: Some(Secret::new("deadbeef")),
            ..PublisherConfig::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("deadbeef"));
    }
}
