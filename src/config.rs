use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Offset (hours east of UTC) for dates printed without a zone
    #[serde(default = "default_timezone_offset_hours")]
    pub timezone_offset_hours: i32,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Overrides the canonical section order
    #[serde(default)]
    pub sections: Option<Vec<String>>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_app_name() -> String {
    "LogiNews".to_string()
}

fn default_timezone_offset_hours() -> i32 {
    crate::date::DEFAULT_OFFSET_HOURS
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "LogiNewsBot/1.0".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub from: String,
    #[serde(default)]
    pub from_name: Option<String>,
    pub to: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub method: SourceMethod,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "method")]
pub enum SourceMethod {
    #[serde(rename = "rss", alias = "feed")]
    Feed { feed_url: String },
    #[serde(rename = "html", alias = "html-list")]
    Html(HtmlSourceConfig),
}

impl SourceMethod {
    pub fn label(&self) -> &'static str {
        match self {
            SourceMethod::Feed { .. } => "rss",
            SourceMethod::Html(_) => "html",
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HtmlSourceConfig {
    pub list_url: String,
    pub base_url: String,
    pub item_selector: String,
    pub title_selector: String,
    pub link_selector: String,
    #[serde(default)]
    pub detail: Option<DetailConfig>,
}

/// Selectors applied to each article's detail page. All optional.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct DetailConfig {
    #[serde(default)]
    pub content_selector: Option<String>,
    #[serde(default)]
    pub date_selector: Option<String>,
    /// Attribute to read the date from (e.g. `datetime`) before falling back to text
    #[serde(default)]
    pub date_attr: Option<String>,
    #[serde(default)]
    pub view_selector: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// A run without any source is a startup error.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("no sources configured");
        }
        Ok(())
    }
}
