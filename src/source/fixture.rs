// src/source/fixture.rs
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Candidate, CandidateSource, SourceError, SourceQuery};

/// Source that hands back a fixed list (or a fixed failure).
pub struct FixtureSource {
    mode: Mode,
    calls: AtomicUsize,
}

enum Mode {
    Items(Vec<Candidate>),
    Fail(String),
}

impl FixtureSource {
    pub fn from_candidates(items: Vec<Candidate>) -> Self {
        Self {
            mode: Mode::Items(items),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            mode: Mode::Fail(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Parse a GitHub search payload (`{"items": [...]}`) or a bare JSON array.
    pub fn from_json(s: &str) -> Result<Self, SourceError> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Payload {
            Search { items: Vec<Candidate> },
            List(Vec<Candidate>),
        }
        let items = match serde_json::from_str::<Payload>(s)
            .map_err(|e| SourceError::Decode(e.to_string()))?
        {
            Payload::Search { items } | Payload::List(items) => items,
        };
        Ok(Self::from_candidates(items))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSource for FixtureSource {
    async fn fetch_trending(&self, _query: &SourceQuery) -> Result<Vec<Candidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            Mode::Items(items) => Ok(items.clone()),
            Mode::Fail(reason) => Err(SourceError::Unavailable(reason.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_fixture_keeps_source_order() {
        let src = FixtureSource::from_json(
            r#"{"items":[
                {"full_name":"c/d","html_url":"https://github.com/c/d"},
                {"full_name":"a/b","html_url":"https://github.com/a/b"}
            ]}"#,
        )
        .unwrap();
        let got = src.fetch_trending(&SourceQuery::default()).await.unwrap();
        let ids: Vec<_> = got.iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(ids, vec!["c/d", "a/b"]);
        assert_eq!(src.calls(), 1);
    }

    #[tokio::test]
    async fn failing_fixture_reports_unavailable() {
        let src = FixtureSource::failing("down");
        let err = src.fetch_trending(&SourceQuery::default()).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
