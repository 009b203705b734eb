//! Summaries and section labels for collected articles.
//!
//! Enrichment never fails: a summarizer that cannot produce anything falls
//! back to the local sentence clipper, and classification always lands in one
//! of the canonical sections.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::model::ArticleRecord;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const MAX_PROMPT_CONTENT_CHARS: usize = 3000;
const MAX_SUMMARY_SENTENCES: usize = 3;
const SUMMARY_TAIL: &str = " → 현장 적용 포인트: 핵심만 확인하세요.";

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[。.!?！？]\s*").expect("sentence pattern is valid"));

/// Keyword lists checked in order; the first hit decides the section.
const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "국내 물류",
        &["korea", "대한", "국내", "물류센터", "택배", "쿠팡", "cj", "한진"],
    ),
    (
        "정책·규제",
        &["policy", "법", "관세", "정부", "규제", "fta", "보조금"],
    ),
    (
        "테크·자동화",
        &[
            "robot", "automation", "agv", "shuttle", "wms", "ai", "vision", "테크", "자동화",
            "로봇",
        ],
    ),
    (
        "라스트마일·이커머스",
        &["라스트마일", "배달", "배송", "이커머스", "commerce", "last mile"],
    ),
];

/// Section for articles that match no keyword list.
pub const DEFAULT_SECTION: &str = "글로벌 동향";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub summary: String,
    pub section: String,
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, title: &str, content: &str) -> Enrichment;
}

/// Fills `summary` and `section` on every record, in place.
pub async fn enrich_all(enricher: &dyn Enricher, records: &mut [ArticleRecord]) {
    for record in records.iter_mut() {
        let result = enricher
            .enrich(record.title.trim(), record.content.trim())
            .await;
        record.summary = Some(result.summary);
        record.section = Some(result.section);
    }
}

/// Local summarizer: the first few sentences of title + body.
#[derive(Debug, Clone, Default)]
pub struct KeywordEnricher;

#[async_trait]
impl Enricher for KeywordEnricher {
    async fn enrich(&self, title: &str, content: &str) -> Enrichment {
        let summary = naive_summarize(title, content);
        let section = classify_section(title, &summary).to_string();
        Enrichment { summary, section }
    }
}

pub fn naive_summarize(title: &str, content: &str) -> String {
    let text = format!("{}。 {}", title.trim(), content.trim()).replace('\n', " ");
    let core = SENTENCE_END
        .split(&text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_SUMMARY_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}{}", core, SUMMARY_TAIL)
}

pub fn classify_section(title: &str, summary: &str) -> &'static str {
    let text = format!("{} {}", title, summary).to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(section, _)| *section)
        .unwrap_or(DEFAULT_SECTION)
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl ChatSettings {
    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_MODEL` (optional).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        Some(Self {
            api_key,
            model,
            base_url: OPENAI_API_URL.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Summarizes through an OpenAI-compatible chat completions endpoint.
pub struct ChatEnricher {
    http: Client,
    settings: ChatSettings,
}

impl ChatEnricher {
    pub fn new(http: Client, settings: ChatSettings) -> Self {
        Self { http, settings }
    }

    async fn summarize(&self, title: &str, content: &str) -> anyhow::Result<String> {
        let clipped: String = content.chars().take(MAX_PROMPT_CONTENT_CHARS).collect();
        let prompt = format!(
            "너는 물류 전문 에디터야. 한국어로 간결하고 친근하게 핵심만 3문장으로 요약해.\n\
             기사 제목: {}\n\
             본문(요약용): {}\n\
             조건: 1) 과장 금지 2) 숫자는 그대로 3) 마지막 문장은 '업무 인사이트' 1줄로 마무리\n\
             출력:",
            title, clipped
        );
        let request = json!({
            "model": self.settings.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": "한국어로 답변해." },
                { "role": "user", "content": prompt },
            ],
        });

        debug!(model = %self.settings.model, "Chat summary request");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("chat API error ({}): {}", status, error_text);
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("empty chat response"))
    }
}

#[async_trait]
impl Enricher for ChatEnricher {
    async fn enrich(&self, title: &str, content: &str) -> Enrichment {
        let summary = match self.summarize(title, content).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(title, error = %e, "Chat summary failed, using local summary");
                naive_summarize(title, content)
            }
        };
        let section = classify_section(title, &summary).to_string();
        Enrichment { summary, section }
    }
}
