use std::cmp::Reverse;

use crate::model::ArticleRecord;

/// Most viewed first, newer first among equal view counts. The sort is
/// stable, so full ties keep their input order.
pub fn rank(mut records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    records.sort_by_key(|record| {
        (
            Reverse(record.effective_view_count()),
            Reverse(record.published_at_epoch()),
        )
    });
    records
}
