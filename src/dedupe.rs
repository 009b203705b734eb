use std::collections::HashSet;

use crate::model::ArticleRecord;

/// Keeps the first record for each URL, in input order. Records without a
/// URL cannot be identified and are dropped.
pub fn dedupe(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| !record.url.is_empty() && seen.insert(record.url.clone()))
        .collect()
}
