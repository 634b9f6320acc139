// src/source/github_search.rs
//! GitHub REST search (`/search/repositories`) as a candidate source.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{Candidate, CandidateSource, SourceError, SourceQuery};

pub const DEFAULT_API_URL: &str = "https://api.github.com/search/repositories";

/// Star band the search restricts itself to: popular, but not the giants
/// that would show up every day.
const STAR_BAND: &str = "stars:1000..15000";
const PER_PAGE: &str = "5";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Candidate>,
}

pub struct GithubSearchSource {
    http: reqwest::Client,
    api_url: String,
}

impl GithubSearchSource {
    pub fn new(api_url: impl Into<String>) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("trending-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }

    /// Search URL for "popular, non-archived repositories in `language`".
    pub fn trending_url(&self, language: &str) -> Result<Url, SourceError> {
        let mut q = format!("{STAR_BAND} archived:false");
        let language = language.trim();
        if !language.is_empty() {
            q.push_str(" language:");
            q.push_str(language);
        }

        let mut url = self.base_url()?;
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("per_page", PER_PAGE)
            .append_pair("sort", "stars")
            .append_pair("order", "desc");
        Ok(url)
    }

    /// Look up one repository by name, optionally narrowed by language and owner.
    pub async fn find_repository(
        &self,
        name: &str,
        language: &str,
        author: &str,
    ) -> Result<Candidate, SourceError> {
        let mut url = self.base_url()?;
        url.set_query(Some(&encode_lookup_query(name, language, author)?));

        let items = self.get_items(url).await?;
        items.into_iter().next().ok_or(SourceError::NotFound)
    }

    fn base_url(&self) -> Result<Url, SourceError> {
        Url::parse(&self.api_url)
            .map_err(|e| SourceError::InvalidQuery(format!("bad api url {}: {e}", self.api_url)))
    }

    async fn get_items(&self, url: Url) -> Result<Vec<Candidate>, SourceError> {
        tracing::debug!(target: "source", %url, "github search request");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }
        let body = resp.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(parsed.items)
    }
}

fn encode_lookup_query(name: &str, language: &str, author: &str) -> Result<String, SourceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SourceError::InvalidQuery("name is empty".into()));
    }

    let mut q = format!("{name} in:name");
    if !author.trim().is_empty() {
        q.push_str(&format!(" user:{}", author.trim()));
    }
    if !language.trim().is_empty() {
        q.push_str(&format!(" language:{}", language.trim()));
    }

    Ok(url::form_urlencoded::Serializer::new(String::new())
        .append_pair("q", &q)
        .finish())
}

#[async_trait]
impl CandidateSource for GithubSearchSource {
    async fn fetch_trending(&self, query: &SourceQuery) -> Result<Vec<Candidate>, SourceError> {
        let url = self.trending_url(&query.language)?;
        self.get_items(url).await
    }

    fn name(&self) -> &'static str {
        "github-search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_url_carries_language_and_paging() {
        let src = GithubSearchSource::new(DEFAULT_API_URL).unwrap();
        let url = src.trending_url("Go").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&(
            "q".to_string(),
            "stars:1000..15000 archived:false language:Go".to_string()
        )));
        assert!(pairs.contains(&("per_page".to_string(), "5".to_string())));
        assert!(pairs.contains(&("sort".to_string(), "stars".to_string())));
    }

    #[test]
    fn lookup_query_requires_name() {
        assert!(matches!(
            encode_lookup_query("", "Go", ""),
            Err(SourceError::InvalidQuery(_))
        ));
    }

    #[test]
    fn lookup_query_appends_optional_filters() {
        assert_eq!(
            encode_lookup_query("dblab", "Go", "danvergara").unwrap(),
            "q=dblab+in%3Aname+user%3Adanvergara+language%3AGo"
        );
        assert_eq!(encode_lookup_query("dblab", "", "").unwrap(), "q=dblab+in%3Aname");
    }
}
