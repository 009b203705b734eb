//! Selector-driven field extraction for list and detail pages.
//!
//! Both functions are pure: they take a page body plus the selector strings
//! from a source's configuration and never fail. Missing or broken selectors
//! just leave the corresponding field empty.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::DetailConfig;
use crate::date::DateNormalizer;

/// A card found on a list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub title: String,
    pub url: String,
}

/// Fields read from an article's detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: Option<u64>,
}

pub fn extract_list(
    body: &str,
    base_url: &str,
    item_selector: &str,
    title_selector: &str,
    link_selector: &str,
) -> Vec<ListItem> {
    let (Some(item_sel), Some(title_sel), Some(link_sel)) = (
        parse_selector(item_selector),
        parse_selector(title_selector),
        parse_selector(link_selector),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(body);
    let mut items = Vec::new();

    for card in document.select(&item_sel) {
        let Some(title_el) = card.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = card
            .select(&link_sel)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            continue;
        };

        items.push(ListItem {
            title: element_text(&title_el),
            url: resolve_link(base_url, href.trim()),
        });
    }

    debug!(count = items.len(), "Extracted list items");
    items
}

pub fn extract_detail(
    body: &str,
    detail: &DetailConfig,
    normalizer: &DateNormalizer,
) -> DetailFields {
    let document = Html::parse_document(body);
    let mut fields = DetailFields::default();

    if let Some(sel) = detail.content_selector.as_deref().and_then(parse_selector) {
        fields.content = document
            .select(&sel)
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }

    if let Some(sel) = detail.date_selector.as_deref().and_then(parse_selector) {
        if let Some(el) = document.select(&sel).next() {
            let from_attr = detail
                .date_attr
                .as_deref()
                .and_then(|attr| el.value().attr(attr));
            let raw = match from_attr {
                Some(value) => value.to_string(),
                None => element_text(&el),
            };
            fields.published_at = normalizer.normalize(Some(&raw));
        }
    }

    if let Some(sel) = detail.view_selector.as_deref().and_then(parse_selector) {
        if let Some(el) = document.select(&sel).next() {
            fields.view_count = parse_view_count(&el.text().collect::<String>());
        }
    }

    fields
}

/// Keeps only the digits of `text`; no digits means no count.
pub fn parse_view_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Joins a relative link onto `base_url` by plain prefixing.
pub fn resolve_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}

/// Flattens an HTML fragment (e.g. a feed entry summary) to plain text.
pub fn html_to_text(fragment: &str) -> String {
    let fragment = Html::parse_fragment(fragment);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(selector: &str) -> Option<Selector> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector, error = %e, "Ignoring invalid selector");
            None
        }
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LIST_PAGE: &str = r#"
        <html><body>
            <ul class="news">
                <li class="card">
                    <h3 class="title">  First
                        headline </h3>
                    <a class="more" href="/news/1">more</a>
                </li>
                <li class="card">
                    <h3 class="title">No link here</h3>
                </li>
                <li class="card">
                    <a class="more" href="/news/3">orphan link</a>
                </li>
                <li class="card">
                    <h3 class="title">Anchor without href</h3>
                    <a class="more">more</a>
                </li>
                <li class="card">
                    <h3 class="title">Absolute</h3>
                    <a class="more" href="https://other.example.com/story">more</a>
                </li>
            </ul>
        </body></html>
    "#;

    fn detail_config(
        content: Option<&str>,
        date: Option<&str>,
        date_attr: Option<&str>,
        view: Option<&str>,
    ) -> DetailConfig {
        DetailConfig {
            content_selector: content.map(String::from),
            date_selector: date.map(String::from),
            date_attr: date_attr.map(String::from),
            view_selector: view.map(String::from),
        }
    }

    mod extract_list_tests {
        use super::*;

        #[test]
        fn test_skips_incomplete_cards() {
            let items = extract_list(
                LIST_PAGE,
                "https://news.example.com/",
                "li.card",
                ".title",
                "a.more",
            );

            assert_eq!(items.len(), 2);
            assert_eq!(items[0].title, "First headline");
            assert_eq!(items[0].url, "https://news.example.com/news/1");
            assert_eq!(items[1].title, "Absolute");
            assert_eq!(items[1].url, "https://other.example.com/story");
        }

        #[test]
        fn test_no_matching_cards() {
            let items = extract_list(LIST_PAGE, "https://a.com", "div.none", ".title", "a");
            assert!(items.is_empty());
        }

        #[test]
        fn test_invalid_selector_yields_nothing() {
            let items = extract_list(LIST_PAGE, "https://a.com", "li[[[", ".title", "a");
            assert!(items.is_empty());
        }
    }

    mod resolve_link_tests {
        use super::*;

        #[test]
        fn test_relative_with_slashes() {
            assert_eq!(
                resolve_link("https://a.com/", "/path/1"),
                "https://a.com/path/1"
            );
        }

        #[test]
        fn test_relative_without_slashes() {
            assert_eq!(resolve_link("https://a.com", "path/1"), "https://a.com/path/1");
        }

        #[test]
        fn test_absolute_is_untouched() {
            assert_eq!(
                resolve_link("https://a.com", "http://b.com/x"),
                "http://b.com/x"
            );
        }

        #[test]
        fn test_query_only_link_is_prefixed() {
            assert_eq!(
                resolve_link("https://a.com/news", "?idx=7"),
                "https://a.com/news/?idx=7"
            );
        }
    }

    mod extract_detail_tests {
        use super::*;

        const DETAIL_PAGE: &str = r#"
            <html><body>
                <div class="info">
                    <time class="date" datetime="2024-01-02T09:00:00+09:00">2024.01.05</time>
                    <span class="date-text">입력 2024.01.03 10:00</span>
                    <span class="views">조회수 1,234회</span>
                    <span class="no-views">조회수 없음</span>
                </div>
                <article>
                    <p>First   paragraph.</p>
                    <p></p>
                    <p>Second
                       paragraph.</p>
                </article>
            </body></html>
        "#;

        #[test]
        fn test_full_detail() {
            let config = detail_config(
                Some("article p"),
                Some("time.date"),
                Some("datetime"),
                Some(".views"),
            );
            let fields = extract_detail(DETAIL_PAGE, &config, &DateNormalizer::default());

            assert_eq!(fields.content, "First paragraph. Second paragraph.");
            assert_eq!(
                fields.published_at,
                Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
            );
            assert_eq!(fields.view_count, Some(1234));
        }

        #[test]
        fn test_date_falls_back_to_text_when_attr_missing() {
            let config = detail_config(None, Some(".date-text"), Some("datetime"), None);
            let fields = extract_detail(DETAIL_PAGE, &config, &DateNormalizer::new(0));

            assert_eq!(
                fields.published_at,
                Some(Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_date_text_without_attr_config() {
            let config = detail_config(None, Some("time.date"), None, None);
            let fields = extract_detail(DETAIL_PAGE, &config, &DateNormalizer::new(0));

            assert_eq!(
                fields.published_at,
                Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_view_count_without_digits_is_none() {
            let config = detail_config(None, None, None, Some(".no-views"));
            let fields = extract_detail(DETAIL_PAGE, &config, &DateNormalizer::default());
            assert_eq!(fields.view_count, None);
        }

        #[test]
        fn test_absent_selectors_yield_empty_fields() {
            let config = DetailConfig::default();
            let fields = extract_detail(DETAIL_PAGE, &config, &DateNormalizer::default());
            assert_eq!(fields, DetailFields::default());
        }

        #[test]
        fn test_unmatched_selectors_yield_empty_fields() {
            let config = detail_config(Some(".body"), Some(".when"), None, Some(".hits"));
            let fields = extract_detail(DETAIL_PAGE, &config, &DateNormalizer::default());
            assert_eq!(fields, DetailFields::default());
        }
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(
            html_to_text("<p>Hello <b>world</b></p>\n<p>again</p>"),
            "Hello world again"
        );
        assert_eq!(html_to_text("plain text"), "plain text");
        assert_eq!(html_to_text(""), "");
    }

    mod view_count_tests {
        use super::*;

        #[test]
        fn test_korean_view_count() {
            assert_eq!(parse_view_count("조회수 1,234회"), Some(1234));
        }

        #[test]
        fn test_no_digits() {
            assert_eq!(parse_view_count("조회수 없음"), None);
        }

        #[test]
        fn test_explicit_zero() {
            assert_eq!(parse_view_count("Views: 0"), Some(0));
        }

        #[test]
        fn test_overflow_is_none() {
            assert_eq!(parse_view_count("99999999999999999999999"), None);
        }
    }
}
