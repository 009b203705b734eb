use askama::Template;
use chrono::{FixedOffset, NaiveDate};

use crate::model::{ArticleRecord, Section};

/// A rendered newsletter, ready to be written to disk or mailed.
#[derive(Debug, Clone)]
pub struct Newsletter {
    pub html: String,
    pub subject: String,
}

#[derive(Template)]
#[template(path = "newsletter.html")]
pub struct NewsletterTemplate {
    pub app_name: String,
    pub subject: String,
    pub run_date: String,
    pub sections: Vec<SectionView>,
}

pub struct SectionView {
    pub name: String,
    pub items: Vec<ItemView>,
}

pub struct ItemView {
    pub title: String,
    pub url: String,
    pub meta: String,
    pub summary: String,
}

impl ItemView {
    /// Publication times are shown at `offset`, the sources' local zone.
    pub fn new(record: &ArticleRecord, offset: FixedOffset) -> Self {
        let mut meta = vec![record.source_name.clone()];
        if let Some(published) = record.published_at {
            meta.push(
                published
                    .with_timezone(&offset)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            );
        }
        if let Some(views) = record.view_count {
            meta.push(format!("조회 {}", views));
        }

        Self {
            title: record.title.clone(),
            url: record.url.clone(),
            meta: meta
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" · "),
            summary: record.summary.clone().unwrap_or_default(),
        }
    }
}

pub fn subject_line(app_name: &str, run_date: NaiveDate) -> String {
    format!(
        "[{}] 오늘의 물류 브리핑 ({})",
        app_name,
        run_date.format("%m/%d")
    )
}

pub fn render_newsletter(
    app_name: &str,
    sections: &[Section],
    run_date: NaiveDate,
    offset: FixedOffset,
) -> anyhow::Result<Newsletter> {
    let subject = subject_line(app_name, run_date);
    let template = NewsletterTemplate {
        app_name: app_name.to_string(),
        subject: subject.clone(),
        run_date: run_date.format("%Y-%m-%d").to_string(),
        sections: sections
            .iter()
            .map(|section| SectionView {
                name: section.name.clone(),
                items: section
                    .items
                    .iter()
                    .map(|record| ItemView::new(record, offset))
                    .collect(),
            })
            .collect(),
    };

    let html = template.render()?;
    Ok(Newsletter { html, subject })
}
