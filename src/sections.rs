use std::collections::HashMap;

use crate::model::{ArticleRecord, Section};

/// Canonical newsletter sections, in presentation order.
pub const CANONICAL_SECTIONS: [&str; 5] = [
    "국내 물류",
    "글로벌 동향",
    "테크·자동화",
    "정책·규제",
    "라스트마일·이커머스",
];

/// Bucket for records that were never classified.
pub const FALLBACK_SECTION: &str = "기타";

/// Splits ranked records into sections without reordering them.
#[derive(Debug, Clone)]
pub struct SectionGrouper {
    order: Vec<String>,
}

impl Default for SectionGrouper {
    fn default() -> Self {
        Self::new(CANONICAL_SECTIONS.iter().map(|s| s.to_string()).collect())
    }
}

impl SectionGrouper {
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Canonical sections come first in configured order, then any other
    /// section in the order it first appears. Empty sections are omitted.
    pub fn group(&self, records: Vec<ArticleRecord>) -> Vec<Section> {
        let mut buckets: HashMap<String, Vec<ArticleRecord>> = HashMap::new();
        let mut extra_names: Vec<String> = Vec::new();

        for record in records {
            let name = record
                .section
                .clone()
                .unwrap_or_else(|| FALLBACK_SECTION.to_string());
            if !self.order.contains(&name) && !buckets.contains_key(&name) {
                extra_names.push(name.clone());
            }
            buckets.entry(name).or_default().push(record);
        }

        self.order
            .iter()
            .chain(extra_names.iter())
            .filter_map(|name| {
                buckets.remove(name).map(|items| Section {
                    name: name.clone(),
                    items,
                })
            })
            .collect()
    }
}
