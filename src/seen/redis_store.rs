// src/seen/redis_store.rs
//! Redis-backed seen-set: `GET key` answers "seen?", `SET key value EX ttl`
//! records an announcement.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, IntoConnectionInfo, RedisError};

use super::{SeenStore, StoreError};
use crate::identity::RepositoryIdentity;

#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// `host:port` or a full `redis://` / `rediss://` URL.
    pub address: String,
    pub password: Option<String>,
    /// Prepended to every key. Empty keeps bare `owner/name` keys.
    pub key_prefix: String,
    /// Upper bound for connect and for each command.
    pub op_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: None,
            key_prefix: String::new(),
            op_timeout: Duration::from_secs(3),
        }
    }
}

impl RedisStoreConfig {
    fn connection_url(&self) -> String {
        let addr = self.address.trim();
        if addr.starts_with("redis://") || addr.starts_with("rediss://") {
            addr.to_string()
        } else {
            format!("redis://{addr}/")
        }
    }
}

#[derive(Clone)]
pub struct RedisSeenStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisSeenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSeenStore")
            .field("address", &self.config.address)
            .field("key_prefix", &self.config.key_prefix)
            .finish_non_exhaustive()
    }
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl RedisSeenStore {
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let mut info = config
            .connection_url()
            .into_connection_info()
            .map_err(unavailable)?;
        if let Some(pw) = config.password.as_ref().filter(|p| !p.is_empty()) {
            info.redis.password = Some(pw.clone());
        }

        let client = Client::open(info).map_err(unavailable)?;
        let connection = tokio::time::timeout(config.op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(config.op_timeout))?
            .map_err(unavailable)?;

        tracing::info!(target: "seen", address = %config.address, "connected to redis seen-set");
        Ok(Self { connection, config })
    }

    fn key(&self, id: &RepositoryIdentity) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        tokio::time::timeout(self.config.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.config.op_timeout))?
            .map_err(unavailable)
    }
}

#[async_trait::async_trait]
impl SeenStore for RedisSeenStore {
    async fn is_seen(&self, key: &RepositoryIdentity) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let k = self.key(key);
        let value: Option<String> = self.bounded(conn.get(&k)).await?;
        Ok(value.is_some())
    }

    async fn mark_seen(
        &self,
        key: &RepositoryIdentity,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let k = self.key(key);
        // Redis rejects EX 0.
        let secs = ttl.as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(&k, value, secs)).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
