// src/seen/memory.rs
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use super::{SeenStore, StoreError};
use crate::identity::RepositoryIdentity;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process seen-set. Good for local runs and tests; it forgets
/// everything on restart.
///
/// Uses `tokio::time::Instant`, so paused-clock tests can move time forward
/// with `tokio::time::advance`.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker stored for `key`, if present and unexpired.
    pub fn value_of(&self, key: &RepositoryIdentity) -> Option<String> {
        let now = Instant::now();
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.get(key.as_str())
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SeenStore for MemorySeenStore {
    async fn is_seen(&self, key: &RepositoryIdentity) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match map.get(key.as_str()) {
            Some(e) if e.expires_at > now => Ok(true),
            Some(_) => {
                map.remove(key.as_str());
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn mark_seen(
        &self,
        key: &RepositoryIdentity,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now + ttl,
        };
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.retain(|_, e| e.expires_at > now);
        map.insert(key.as_str().to_string(), entry);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
