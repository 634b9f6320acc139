// tests/config_env.rs
//
// `load_default()` resolution: explicit path, env overlay, validation.
// Serialized because the tests mutate process env.

use std::io::Write;

use serial_test::serial;
use trending_relay::config::{self, SourceKind, ENV_CONFIG_PATH};
use trending_relay::source::TimeWindow;

const TOUCHED: &[&str] = &[
    ENV_CONFIG_PATH,
    "NOSTR_HEX_SK",
    "NOSTR_RELAYS",
    "REDIS_HOST",
    "SEEN_TTL_SECS",
    "RATE_INTERVAL_MS",
    "BATCH_CAP",
    "TRENDING_WINDOW",
    "TRENDING_SOURCE",
];

fn clear_env() {
    for k in TOUCHED {
        std::env::remove_var(k);
    }
}

#[test]
#[serial]
fn file_then_env_overlay() {
    clear_env();
    let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        f,
        r#"
relays = ["wss://relay.example"]
batch_cap = 3

[source]
kind = "search"
language = "Rust"
"#
    )
    .unwrap();

    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var("RATE_INTERVAL_MS", "250");
    std::env::set_var("TRENDING_WINDOW", "weekly");
    std::env::set_var("REDIS_HOST", "localhost:6379");

    let cfg = config::load_default().expect("config loads");
    clear_env();

    assert_eq!(cfg.relays, vec!["wss://relay.example".to_string()]);
    assert_eq!(cfg.batch_cap, 3);
    assert_eq!(cfg.rate_interval_ms, 250);
    assert_eq!(cfg.seen_ttl_secs, 129_600);
    assert_eq!(cfg.source.kind, SourceKind::Search);
    assert_eq!(cfg.source.language, "Rust");
    assert_eq!(cfg.source.window, TimeWindow::Weekly);
    assert_eq!(cfg.store.address.as_deref(), Some("localhost:6379"));
}

#[test]
#[serial]
fn missing_explicit_path_is_an_error() {
    clear_env();
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    let res = config::load_default();
    clear_env();
    assert!(res.is_err());
}

#[test]
#[serial]
fn bad_overrides_are_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("publisher.json");
    std::fs::write(&path, r#"{ "relays": ["https://not-ws.example"] }"#).unwrap();

    std::env::set_var(ENV_CONFIG_PATH, &path);
    assert!(config::load_default().is_err(), "http relay must be rejected");

    std::env::set_var("NOSTR_RELAYS", "wss://a.example, wss://b.example");
    std::env::set_var("BATCH_CAP", "0");
    assert!(config::load_default().is_err(), "zero cap must be rejected");

    std::env::set_var("BATCH_CAP", "lots");
    assert!(config::load_default().is_err(), "non-numeric cap must be rejected");

    std::env::set_var("BATCH_CAP", "5");
    let cfg = config::load_default().unwrap();
    clear_env();
    assert_eq!(cfg.relays.len(), 2);
    assert_eq!(cfg.batch_cap, 5);
}
