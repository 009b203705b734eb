use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};
use tracing::info;

use crate::collector::SourceCollector;
use crate::config::{Config, SourceConfig};
use crate::date::DateNormalizer;
use crate::dedupe::dedupe;
use crate::enrich::{enrich_all, Enricher};
use crate::fetcher::Fetch;
use crate::model::{ArticleRecord, Section};
use crate::rank::rank;
use crate::sections::SectionGrouper;

/// How a single source fared during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source_name: String,
    pub article_count: usize,
    pub error: Option<String>,
}

/// The ranked, grouped output of one pipeline run.
#[derive(Debug, Clone)]
pub struct Digest {
    /// Calendar date of the run at `offset`.
    pub run_date: NaiveDate,
    /// The sources' local zone, used when showing times.
    pub offset: FixedOffset,
    pub sections: Vec<Section>,
    pub reports: Vec<SourceReport>,
}

impl Digest {
    /// Articles in presentation order.
    pub fn articles(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn article_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }
}

pub struct Pipeline {
    sources: Vec<SourceConfig>,
    collector: SourceCollector,
    enricher: Arc<dyn Enricher>,
    grouper: SectionGrouper,
}

impl Pipeline {
    pub fn new(
        sources: Vec<SourceConfig>,
        collector: SourceCollector,
        enricher: Arc<dyn Enricher>,
        grouper: SectionGrouper,
    ) -> Self {
        Self {
            sources,
            collector,
            enricher,
            grouper,
        }
    }

    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetch>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        let normalizer = DateNormalizer::new(config.timezone_offset_hours);
        let grouper = match &config.sections {
            Some(order) => SectionGrouper::new(order.clone()),
            None => SectionGrouper::default(),
        };
        Self::new(
            config.sources.clone(),
            SourceCollector::new(fetcher, normalizer),
            enricher,
            grouper,
        )
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Collect, dedupe, enrich, rank and group. Source failures are reported
    /// (the collector logs them), never fatal.
    pub async fn run(&self) -> Digest {
        let outcomes = self.collector.collect_all(&self.sources).await;

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(items) => {
                    reports.push(SourceReport {
                        source_name: outcome.source_name,
                        article_count: items.len(),
                        error: None,
                    });
                    records.extend(items);
                }
                Err(e) => reports.push(SourceReport {
                    source_name: outcome.source_name,
                    article_count: 0,
                    error: Some(e.to_string()),
                }),
            }
        }

        let collected = records.len();
        let mut records = dedupe(records);
        info!(collected, unique = records.len(), "Deduplicated articles");

        enrich_all(self.enricher.as_ref(), &mut records).await;
        let sections = self.grouper.group(rank(records));

        let offset = self.collector.normalizer().offset();
        Digest {
            run_date: Utc::now().with_timezone(&offset).date_naive(),
            offset,
            sections,
            reports,
        }
    }
}
