// src/config/mod.rs
pub mod publisher;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use publisher::{
    load_default, load_from, PublisherConfig, SourceConfig, SourceKind, StoreConfig,
    TelegramConfig, ENV_CONFIG_PATH,
};

/// String that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(len={})", self.0.len())
    }
}
