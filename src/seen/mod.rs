// src/seen/mod.rs
//! Seen-set: "was this repository already announced, and is that claim
//! still valid?"
//!
//! Entries expire on their own after the TTL given at insertion; nothing
//! deletes them explicitly. A lookup that cannot reach the backing store is
//! an error, never "not seen".

pub mod memory;
pub mod redis_store;

use std::time::Duration;

use thiserror::Error;

use crate::identity::RepositoryIdentity;

pub use memory::MemorySeenStore;
pub use redis_store::{RedisSeenStore, RedisStoreConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seen-set store unavailable: {0}")]
    Unavailable(String),
    #[error("seen-set store timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait::async_trait]
pub trait SeenStore: Send + Sync {
    /// `Ok(false)` for "not found"; `Err` only when the store could not answer.
    async fn is_seen(&self, key: &RepositoryIdentity) -> Result<bool, StoreError>;

    /// Record `key` with an opaque marker `value`, expiring after `ttl`.
    /// Writing the same key twice is harmless.
    async fn mark_seen(
        &self,
        key: &RepositoryIdentity,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}
