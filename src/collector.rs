use std::sync::Arc;

use feed_rs::parser;
use tracing::{error, info, warn};

use crate::config::{HtmlSourceConfig, SourceConfig, SourceMethod};
use crate::date::DateNormalizer;
use crate::error::CollectError;
use crate::extract::{extract_detail, extract_list, html_to_text};
use crate::fetcher::Fetch;
use crate::model::ArticleRecord;

/// Result of collecting one configured source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source_name: String,
    pub result: Result<Vec<ArticleRecord>, CollectError>,
}

impl SourceOutcome {
    pub fn article_count(&self) -> usize {
        self.result.as_ref().map(Vec::len).unwrap_or(0)
    }
}

pub struct SourceCollector {
    fetcher: Arc<dyn Fetch>,
    normalizer: DateNormalizer,
}

impl SourceCollector {
    pub fn new(fetcher: Arc<dyn Fetch>, normalizer: DateNormalizer) -> Self {
        Self {
            fetcher,
            normalizer,
        }
    }

    pub fn normalizer(&self) -> DateNormalizer {
        self.normalizer
    }

    /// Collects every source in order, one request at a time. A failing
    /// source never affects the others.
    pub async fn collect_all(&self, sources: &[SourceConfig]) -> Vec<SourceOutcome> {
        let mut outcomes = Vec::with_capacity(sources.len());

        for source in sources {
            let result = self.collect(source).await;
            match &result {
                Ok(records) => info!(
                    source = %source.name,
                    method = source.method.label(),
                    count = records.len(),
                    "Collected source"
                ),
                Err(e) => error!(source = %source.name, error = %e, "Failed to collect source"),
            }
            outcomes.push(SourceOutcome {
                source_name: source.name.clone(),
                result,
            });
        }

        outcomes
    }

    pub async fn collect(&self, source: &SourceConfig) -> Result<Vec<ArticleRecord>, CollectError> {
        match &source.method {
            SourceMethod::Feed { feed_url } => self.collect_feed(&source.name, feed_url).await,
            SourceMethod::Html(html) => self.collect_html(&source.name, html).await,
        }
    }

    async fn collect_feed(
        &self,
        source_name: &str,
        feed_url: &str,
    ) -> Result<Vec<ArticleRecord>, CollectError> {
        info!("Fetching feed: {} ({})", source_name, feed_url);

        let body = self.fetcher.fetch(feed_url).await?;
        parse_feed(&body, source_name, self.normalizer)
    }

    async fn collect_html(
        &self,
        source_name: &str,
        html: &HtmlSourceConfig,
    ) -> Result<Vec<ArticleRecord>, CollectError> {
        info!("Fetching list page: {} ({})", source_name, html.list_url);

        let body = self.fetcher.fetch(&html.list_url).await?;
        let mut records: Vec<ArticleRecord> = extract_list(
            &body,
            &html.base_url,
            &html.item_selector,
            &html.title_selector,
            &html.link_selector,
        )
        .into_iter()
        .map(|item| ArticleRecord {
            source_name: source_name.to_string(),
            ..ArticleRecord::new(item.title, item.url)
        })
        .collect();

        let Some(detail) = &html.detail else {
            return Ok(records);
        };

        for record in records.iter_mut() {
            match self.fetcher.fetch(&record.url).await {
                Ok(page) => {
                    let fields = extract_detail(&page, detail, &self.normalizer);
                    record.content = fields.content;
                    record.published_at = fields.published_at;
                    record.view_count = fields.view_count;
                }
                Err(e) => {
                    // Keep the list-page fields.
                    warn!(
                        source = source_name,
                        url = %record.url,
                        error = %e,
                        "Detail page fetch failed"
                    );
                }
            }
        }

        Ok(records)
    }
}

/// Turns a feed document into records. Dates go through `normalizer`.
pub fn parse_feed(
    body: &str,
    source_name: &str,
    normalizer: DateNormalizer,
) -> Result<Vec<ArticleRecord>, CollectError> {
    let feed = parser::Builder::new()
        .timestamp_parser(move |raw: &str| normalizer.normalize(Some(raw)))
        .build()
        .parse(body.as_bytes())?;

    let records = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();
            let url = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();
            let content = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|raw| html_to_text(&raw))
                .unwrap_or_default();

            ArticleRecord {
                title,
                url,
                published_at: entry.published.or(entry.updated),
                view_count: None,
                content,
                source_name: source_name.to_string(),
                summary: None,
                section: None,
            }
        })
        .collect();

    Ok(records)
}
