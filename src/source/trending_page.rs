// src/source/trending_page.rs
//! Scrapes `github.com/trending` into candidates.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use url::Url;

use super::{Candidate, CandidateSource, SourceError, SourceQuery};
use crate::identity::RepositoryIdentity;

pub const DEFAULT_BASE_URL: &str = "https://github.com";
const TRENDING_PATH: &str = "/trending";

pub struct TrendingPageSource {
    mode: Mode,
}

enum Mode {
    // Owned copy so tests can feed any &str.
    Fixture(String),
    Http { base: Url, client: reqwest::Client },
}

impl TrendingPageSource {
    pub fn from_fixture(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn from_base_url(base: &str) -> Result<Self, SourceError> {
        let base = Url::parse(base)
            .map_err(|e| SourceError::InvalidQuery(format!("bad base url {base}: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("trending-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            mode: Mode::Http { base, client },
        })
    }

    fn base(&self) -> Result<Url, SourceError> {
        match &self.mode {
            Mode::Http { base, .. } => Ok(base.clone()),
            Mode::Fixture(_) => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| SourceError::InvalidQuery(e.to_string())),
        }
    }
}

/// `https://github.com/trending?since=<window>&l=<language>`
pub fn trending_url(base: &Url, query: &SourceQuery) -> Result<Url, SourceError> {
    let mut url = base
        .join(TRENDING_PATH)
        .map_err(|e| SourceError::InvalidQuery(e.to_string()))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("since", query.window.as_str());
        if !query.language.trim().is_empty() {
            pairs.append_pair("l", query.language.trim());
        }
    }
    Ok(url)
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

fn strip_tags(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let plain = re(&RE_TAGS, r"(?s)<[^>]+>").replace_all(s, "");
    html_escape::decode_html_entities(&plain).trim().to_string()
}

/// Parse the trending page; rows without a usable `owner/name` are dropped.
pub fn parse_trending_html(html: &str, base: &Url) -> Vec<Candidate> {
    static RE_ROW: OnceCell<Regex> = OnceCell::new();
    static RE_TITLE: OnceCell<Regex> = OnceCell::new();
    static RE_DESC: OnceCell<Regex> = OnceCell::new();
    static RE_LANG: OnceCell<Regex> = OnceCell::new();
    static RE_STARS: OnceCell<Regex> = OnceCell::new();

    let row_re = re(
        &RE_ROW,
        r#"(?s)<article[^>]*class="[^"]*Box-row[^"]*"[^>]*>(.*?)</article>"#,
    );
    let title_re = re(
        &RE_TITLE,
        r#"(?s)<h2[^>]*>.*?<a[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#,
    );
    let desc_re = re(&RE_DESC, r"(?s)<p[^>]*>(.*?)</p>");
    let lang_re = re(
        &RE_LANG,
        r#"(?s)<span[^>]*itemprop="programmingLanguage"[^>]*>(.*?)</span>"#,
    );
    let stars_re = re(
        &RE_STARS,
        r#"(?s)<a[^>]*href="[^"]*/stargazers"[^>]*>(.*?)</a>"#,
    );

    let mut out = Vec::new();
    for row in row_re.captures_iter(html) {
        let body = &row[1];
        let Some(title) = title_re.captures(body) else {
            continue;
        };

        let raw_name = strip_tags(&title[2]);
        let identity = match RepositoryIdentity::parse(&raw_name) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(target: "source", error = %e, "skipping trending row");
                continue;
            }
        };

        let url = base
            .join(&title[1])
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{DEFAULT_BASE_URL}/{identity}"));

        let description = desc_re
            .captures(body)
            .map(|c| strip_tags(&c[1]))
            .filter(|d| !d.is_empty());
        let language = lang_re
            .captures(body)
            .map(|c| strip_tags(&c[1]))
            .filter(|l| !l.is_empty());
        // Zero is fine when the counter is missing or unparsable.
        let stars = stars_re
            .captures(body)
            .map(|c| strip_tags(&c[1]).replace(',', ""))
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let mut candidate = Candidate::new(identity, url);
        candidate.description = description;
        candidate.language = language;
        candidate.stars = stars;
        out.push(candidate);
    }
    out
}

#[async_trait]
impl CandidateSource for TrendingPageSource {
    async fn fetch_trending(&self, query: &SourceQuery) -> Result<Vec<Candidate>, SourceError> {
        let base = self.base()?;
        match &self.mode {
            Mode::Fixture(html) => Ok(parse_trending_html(html, &base)),
            Mode::Http { client, .. } => {
                let url = trending_url(&base, query)?;
                tracing::debug!(target: "source", %url, "fetching trending page");
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(SourceError::Status(status));
                }
                let html = resp.text().await?;
                Ok(parse_trending_html(&html, &base))
            }
        }
    }

    fn name(&self) -> &'static str {
        "github-trending"
    }
}
