use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single article as it moves through the pipeline.
///
/// Collectors fill in the scraped fields, enrichment adds `summary` and
/// `section`. `url` is the article's identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: Option<u64>,
    pub content: String,
    pub source_name: String,
    pub summary: Option<String>,
    pub section: Option<String>,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Epoch seconds of `published_at`, or 0 when the date is unknown.
    pub fn published_at_epoch(&self) -> i64 {
        self.published_at.map(|dt| dt.timestamp()).unwrap_or(0)
    }

    /// View count used for ranking; a missing count ranks like zero.
    pub fn effective_view_count(&self) -> u64 {
        self.view_count.unwrap_or(0)
    }
}

/// A named bucket of ranked articles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub items: Vec<ArticleRecord>,
}
