use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logi_news::cli::{Cli, Command};
use logi_news::config::Config;
use logi_news::db::Database;
use logi_news::enrich::{ChatEnricher, ChatSettings, Enricher, KeywordEnricher};
use logi_news::fetcher::{FetchSettings, HttpFetcher};
use logi_news::notify::{NoopNotifier, Notifier, SendGridNotifier};
use logi_news::pipeline::{Digest, Pipeline};
use logi_news::render::{render_newsletter, Newsletter};
use logi_news::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logi_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;
    config.validate()?;
    info!(
        "Loaded {} sources from {}",
        config.sources.len(),
        cli.config.display()
    );

    let fetcher = Arc::new(HttpFetcher::new(&FetchSettings::from_config(&config))?);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let enricher: Arc<dyn Enricher> = match ChatSettings::from_env() {
        Some(settings) => {
            info!(model = %settings.model, "Using chat summarizer");
            Arc::new(ChatEnricher::new(http.clone(), settings))
        }
        None => {
            info!("OPENAI_API_KEY not set, using local summarizer");
            Arc::new(KeywordEnricher)
        }
    };
    let pipeline = Arc::new(Pipeline::from_config(&config, fetcher, enricher));

    match cli.command {
        Command::Run {
            out_dir,
            send,
            no_persist,
        } => {
            let digest = pipeline.run().await;
            let newsletter = render_newsletter(
                &config.app_name,
                &digest.sections,
                digest.run_date,
                digest.offset,
            )?;
            write_preview(&out_dir, &digest, &newsletter)?;

            // Persistence and delivery failures are logged, never fatal.
            if !no_persist {
                match open_database(&config).await {
                    Ok(db) => match db.record_run(&digest).await {
                        Ok(saved) => info!(saved, "Articles saved"),
                        Err(e) => error!(error = %e, "Failed to save articles"),
                    },
                    Err(e) => error!(error = %e, "Failed to open database"),
                }
            }

            if send {
                let notifier = build_notifier(&config, http);
                if let Err(e) = notifier.send(&newsletter).await {
                    error!(error = %e, "Failed to send newsletter");
                }
            }

            let failed = digest.failed_sources().count();
            info!(
                articles = digest.article_count(),
                sections = digest.sections.len(),
                failed_sources = failed,
                "Run complete"
            );
        }
        Command::Serve { addr } => {
            let db = match open_database(&config).await {
                Ok(db) => Some(Arc::new(db)),
                Err(e) => {
                    warn!(error = %e, "Database unavailable, serving without persistence");
                    None
                }
            };

            let state = Arc::new(AppState::new(&config.app_name, pipeline, db));
            let app = routes::router(state);

            // Start server
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Server starting on http://{}", addr);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn open_database(config: &Config) -> anyhow::Result<Database> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:logi_news.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    db.sync_sources(&config.sources).await?;
    info!("Database initialized");
    Ok(db)
}

fn build_notifier(config: &Config, http: reqwest::Client) -> Box<dyn Notifier> {
    let api_key = std::env::var("SENDGRID_API_KEY").ok();
    match (&config.email, api_key) {
        (Some(email), Some(key)) if !key.trim().is_empty() => {
            Box::new(SendGridNotifier::new(http, &key, email, &config.app_name))
        }
        _ => {
            warn!("Email not configured (need [email] and SENDGRID_API_KEY), skipping send");
            Box::new(NoopNotifier)
        }
    }
}

fn write_preview(out_dir: &Path, digest: &Digest, newsletter: &Newsletter) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let file_name = format!("newsletter_{}.html", digest.run_date.format("%Y%m%d"));
    let path = out_dir.join(file_name);
    std::fs::write(&path, &newsletter.html)?;
    info!(path = %path.display(), subject = %newsletter.subject, "Preview written");
    Ok(())
}
