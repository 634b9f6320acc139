// src/identity.rs
//! Repository identity: the canonical `owner/name` key used for dedup.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("repository identity is empty")]
    Empty,
    #[error("repository identity `{0}` is not of the form owner/name")]
    Malformed(String),
}

/// Stable `owner/name` key of a repository.
///
/// Whitespace anywhere in the raw value is dropped, so scraped names such as
/// `"owner /\n   name"` collapse to `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryIdentity(String);

impl RepositoryIdentity {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(IdentityError::Empty);
        }

        let mut parts = compact.split('/');
        let owner = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        if owner.is_empty() || name.is_empty() || parts.next().is_some() {
            return Err(IdentityError::Malformed(raw.trim().to_string()));
        }

        Ok(Self(compact))
    }

    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RepositoryIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryIdentity> for String {
    fn from(id: RepositoryIdentity) -> Self {
        id.0
    }
}

impl AsRef<str> for RepositoryIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
