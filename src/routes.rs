use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::db::{Database, StoredArticle, StoredSource};
use crate::pipeline::Pipeline;
use crate::render::{render_newsletter, Newsletter};

pub struct AppState {
    pub app_name: String,
    pub pipeline: Arc<Pipeline>,
    pub db: Option<Arc<Database>>,
    latest: RwLock<Option<Newsletter>>,
    refreshing: RwLock<bool>,
}

impl AppState {
    pub fn new(app_name: &str, pipeline: Arc<Pipeline>, db: Option<Arc<Database>>) -> Self {
        Self {
            app_name: app_name.to_string(),
            pipeline,
            db,
            latest: RwLock::new(None),
            refreshing: RwLock::new(false),
        }
    }

    pub async fn is_refreshing(&self) -> bool {
        *self.refreshing.read().await
    }

    pub async fn latest(&self) -> Option<Newsletter> {
        self.latest.read().await.clone()
    }

    /// Runs the pipeline and caches the rendered newsletter. Returns `None`
    /// when another run is already in progress.
    pub async fn refresh(&self) -> anyhow::Result<Option<Newsletter>> {
        {
            let mut refreshing = self.refreshing.write().await;
            if *refreshing {
                return Ok(None);
            }
            *refreshing = true;
        }

        let result = self.run_once().await;
        *self.refreshing.write().await = false;

        let newsletter = result?;
        *self.latest.write().await = Some(newsletter.clone());
        Ok(Some(newsletter))
    }

    async fn run_once(&self) -> anyhow::Result<Newsletter> {
        let digest = self.pipeline.run().await;
        info!(articles = digest.article_count(), "Digest refreshed");

        if let Some(db) = &self.db {
            if let Err(e) = db.record_run(&digest).await {
                error!(error = %e, "Failed to persist digest");
            }
        }

        render_newsletter(
            &self.app_name,
            &digest.sections,
            digest.run_date,
            digest.offset,
        )
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/refresh", post(refresh))
        .route("/refresh/status", get(refresh_status))
        .route("/archive", get(archive))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Template)]
#[template(path = "refresh_button.html")]
pub struct RefreshButtonTemplate {
    pub refreshing: bool,
}

/// The preview page: toolbar with the refresh control, newsletter below.
#[derive(Template)]
#[template(path = "preview.html")]
pub struct PreviewTemplate {
    pub app_name: String,
    pub subject: String,
    pub newsletter_html: String,
    pub refreshing: bool,
}

impl PreviewTemplate {
    fn new(app_name: &str, newsletter: Option<Newsletter>, refreshing: bool) -> Self {
        let (subject, newsletter_html) = match newsletter {
            Some(n) => (n.subject, n.html),
            None => (String::new(), String::new()),
        };
        Self {
            app_name: app_name.to_string(),
            subject,
            newsletter_html,
            refreshing,
        }
    }
}

pub struct SourceRow {
    pub name: String,
    pub method: String,
    pub last_fetched: String,
    pub last_error: String,
}

impl From<StoredSource> for SourceRow {
    fn from(source: StoredSource) -> Self {
        Self {
            name: source.name,
            method: source.method,
            last_fetched: source.last_fetched.unwrap_or_else(|| "-".to_string()),
            last_error: source.last_error.unwrap_or_default(),
        }
    }
}

pub struct ArticleRow {
    pub url: String,
    pub title: String,
    pub source_name: String,
    pub section: String,
    pub collected_at: String,
}

impl From<StoredArticle> for ArticleRow {
    fn from(article: StoredArticle) -> Self {
        Self {
            url: article.url,
            title: article.title,
            source_name: article.source_name,
            section: article.section.unwrap_or_default(),
            collected_at: article.collected_at,
        }
    }
}

#[derive(Template)]
#[template(path = "archive.html")]
pub struct ArchiveTemplate {
    pub app_name: String,
    pub sources: Vec<SourceRow>,
    pub articles: Vec<ArticleRow>,
}

const ARCHIVE_LIMIT: i64 = 100;

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

/// Serves the cached newsletter inside the preview page, building it on
/// first request.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let newsletter = match state.latest().await {
        Some(newsletter) => Some(newsletter),
        None => state.refresh().await?,
    };
    let refreshing = state.is_refreshing().await;

    Ok(HtmlTemplate(PreviewTemplate::new(&state.app_name, newsletter, refreshing)).into_response())
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let bg_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = bg_state.refresh().await {
            error!(error = %e, "Background refresh failed");
        }
    });

    HtmlTemplate(RefreshButtonTemplate { refreshing: true })
}

/// Polled by the button while a run is in progress. Once idle, `HX-Refresh`
/// makes htmx reload the page so the new newsletter shows up.
pub async fn refresh_status(State(state): State<Arc<AppState>>) -> Response {
    let refreshing = state.is_refreshing().await;
    let button = HtmlTemplate(RefreshButtonTemplate { refreshing });
    if refreshing {
        button.into_response()
    } else {
        ([("HX-Refresh", "true")], button).into_response()
    }
}

/// Stored sources with their last fetch status, and the latest articles.
pub async fn archive(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let Some(db) = &state.db else {
        return Ok((StatusCode::NOT_FOUND, "Persistence is disabled").into_response());
    };

    let sources = db.get_all_sources().await?;
    let articles = db.recent_articles(ARCHIVE_LIMIT).await?;

    Ok(HtmlTemplate(ArchiveTemplate {
        app_name: state.app_name.clone(),
        sources: sources.into_iter().map(SourceRow::from).collect(),
        articles: articles.into_iter().map(ArticleRow::from).collect(),
    })
    .into_response())
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
