// src/render.rs
//! Turns candidate records into human-readable message bodies.

use once_cell::sync::OnceCell;
use regex::Regex;
use thiserror::Error;

use crate::source::Candidate;

/// Telegram's hard limit for a single message; relays accept more, chats don't.
pub const DEFAULT_MAX_CHARS: usize = 4096;
const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("rendered message is empty")]
    Empty,
    #[error("rendered message has {len} chars, limit is {limit}")]
    TooLong { len: usize, limit: usize },
}

pub trait Renderer: Send + Sync {
    fn render(&self, candidate: &Candidate) -> Result<String, RenderError>;
}

/// Normalize free text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    let decoded = html_escape::decode_html_entities(s).to_string();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let untagged = re_tags.replace_all(&decoded, "");
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let mut out = re_ws.replace_all(&untagged, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
    }
    out
}

fn hashtag(language: &str) -> Option<String> {
    let tag: String = language
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    (!tag.is_empty()).then(|| format!("#{tag}"))
}

/// Announcement note for one repository.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    max_chars: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl TextRenderer {
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Renderer for TextRenderer {
    fn render(&self, c: &Candidate) -> Result<String, RenderError> {
        if c.url.trim().is_empty() {
            return Err(RenderError::Empty);
        }

        let mut lines = Vec::with_capacity(6);

        match c.language.as_deref().filter(|l| !l.is_empty()) {
            Some(lang) => lines.push(format!("{} ({lang})", c.identity)),
            None => lines.push(c.identity.to_string()),
        }
        if let Some(desc) = c.description.as_deref() {
            let desc = normalize_text(desc, DESCRIPTION_MAX_CHARS);
            if !desc.is_empty() {
                lines.push(desc);
            }
        }
        lines.push(format!("★ {}", c.stars));
        lines.push(c.url.trim().to_string());

        let mut tags = vec!["#github".to_string(), "#trending".to_string()];
        if let Some(t) = c.language.as_deref().and_then(hashtag) {
            tags.push(t);
        }
        lines.push(tags.join(" "));

        let text = lines.join("\n");
        let len = text.chars().count();
        if len > self.max_chars {
            return Err(RenderError::TooLong {
                len,
                limit: self.max_chars,
            });
        }
        Ok(text)
    }
}

/// Multi-repository listing used for chat replies.
pub fn render_listing(items: &[Candidate]) -> String {
    let mut out = format!("{} repositories:\n", items.len());
    for c in items {
        out.push_str("----------------------------------------\n");
        out.push_str(&format!("Name:          {}\n", c.identity));
        out.push_str(&format!("Url:           {}\n", c.url));
        out.push_str(&format!(
            "Description:   {}\n",
            normalize_text(c.description.as_deref().unwrap_or_default(), DESCRIPTION_MAX_CHARS)
        ));
        out.push_str(&format!(
            "Language:      {}\n",
            c.language.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!("Stargazers:    {}\n", c.stars));
        out.push_str(&format!("Forks:         {}\n", c.forks));
        out.push_str(&format!("Archived:      {}\n", c.archived));
        out.push_str(&format!("Open Issues:   {}\n", c.open_issues));
        out.push_str(&format!("Topics:        {}\n", c.topics.join(", ")));
    }
    out
}
