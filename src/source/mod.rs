// src/source/mod.rs
pub mod fixture;
pub mod github_search;
pub mod trending_page;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::RepositoryIdentity;

pub use fixture::FixtureSource;
pub use github_search::GithubSearchSource;
pub use trending_page::TrendingPageSource;

/// One repository eligible for announcement. Immutable once fetched.
///
/// Field names follow the GitHub REST representation so search results
/// deserialize straight into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "full_name")]
    pub identity: RepositoryIdentity,
    #[serde(rename = "html_url")]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(rename = "stargazers_count", default)]
    pub stars: u64,
    #[serde(rename = "forks_count", default)]
    pub forks: u64,
    #[serde(rename = "open_issues_count", default)]
    pub open_issues: u64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Candidate {
    /// Minimal record; the remaining metadata only feeds rendering.
    pub fn new(identity: RepositoryIdentity, url: impl Into<String>) -> Self {
        Self {
            identity,
            url: url.into(),
            description: None,
            language: None,
            stars: 0,
            forks: 0,
            open_issues: 0,
            archived: false,
            topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Daily => "daily",
            TimeWindow::Weekly => "weekly",
            TimeWindow::Monthly => "monthly",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "today" => Ok(TimeWindow::Daily),
            "weekly" | "week" => Ok(TimeWindow::Weekly),
            "monthly" | "month" => Ok(TimeWindow::Monthly),
            other => Err(SourceError::InvalidQuery(format!(
                "unknown time window `{other}`"
            ))),
        }
    }
}

/// What to ask a source for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceQuery {
    pub window: TimeWindow,
    /// Empty means "any language".
    pub language: String,
}

impl SourceQuery {
    pub fn new(window: TimeWindow, language: impl Into<String>) -> Self {
        Self {
            window,
            language: language.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("source answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("source payload could not be decoded: {0}")]
    Decode(String),
    #[error("invalid source query: {0}")]
    InvalidQuery(String),
    #[error("repository not found")]
    NotFound,
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Produces an ordered, finite list of candidates for a query.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_trending(&self, query: &SourceQuery) -> Result<Vec<Candidate>, SourceError>;
    fn name(&self) -> &'static str;
}
