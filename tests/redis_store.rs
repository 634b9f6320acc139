// tests/redis_store.rs
//
// Live Redis round-trip. Needs `--features redis-tests` and `REDIS_URL`
// (e.g. redis://127.0.0.1:6379); run with `--ignored`.
#![cfg(feature = "redis-tests")]

use std::time::Duration;

use trending_relay::identity::RepositoryIdentity;
use trending_relay::seen::{RedisSeenStore, RedisStoreConfig, SeenStore};

#[tokio::test]
#[ignore]
async fn set_ex_then_get_then_expire() {
    let address = std::env::var("REDIS_URL").expect("REDIS_URL");
    let store = RedisSeenStore::connect(RedisStoreConfig {
        address,
        key_prefix: format!("trending-relay-test-{}:", std::process::id()),
        ..RedisStoreConfig::default()
    })
    .await
    .expect("connect");

    let key = RepositoryIdentity::parse("danvergara/dblab").unwrap();
    assert!(!store.is_seen(&key).await.unwrap());

    store
        .mark_seen(&key, "https://github.com/danvergara/dblab", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(store.is_seen(&key).await.unwrap());

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert!(!store.is_seen(&key).await.unwrap());
}
