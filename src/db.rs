use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

use crate::config::SourceConfig;
use crate::model::ArticleRecord;
use crate::pipeline::Digest;

#[derive(Debug, Clone, FromRow)]
pub struct StoredSource {
    pub id: i64,
    pub name: String,
    pub method: String,
    pub last_fetched: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredArticle {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub source_name: String,
    pub published_at: Option<String>,
    pub view_count: Option<i64>,
    pub content: String,
    pub summary: Option<String>,
    pub section: Option<String>,
    pub collected_at: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                method TEXT NOT NULL,
                last_fetched TEXT,
                last_error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                source_name TEXT NOT NULL,
                published_at TEXT,
                view_count INTEGER,
                content TEXT NOT NULL DEFAULT '',
                summary TEXT,
                section TEXT,
                collected_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_collected
            ON articles(collected_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn sync_sources(&self, configs: &[SourceConfig]) -> anyhow::Result<()> {
        for config in configs {
            sqlx::query(
                r#"
                INSERT INTO sources (name, method)
                VALUES (?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    method = excluded.method
                "#,
            )
            .bind(&config.name)
            .bind(config.method.label())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn get_all_sources(&self) -> anyhow::Result<Vec<StoredSource>> {
        let sources = sqlx::query_as::<_, StoredSource>("SELECT * FROM sources ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(sources)
    }

    pub async fn get_source(&self, name: &str) -> anyhow::Result<Option<StoredSource>> {
        let source = sqlx::query_as::<_, StoredSource>("SELECT * FROM sources WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(source)
    }

    pub async fn update_source_fetched(
        &self,
        name: &str,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE sources
            SET last_fetched = ?, last_error = ?
            WHERE name = ?
            "#,
        )
        .bind(&now)
        .bind(error)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upserts every article by URL inside one transaction.
    pub async fn save_articles(&self, articles: &[ArticleRecord]) -> anyhow::Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for article in articles {
            let view_count = article.view_count.and_then(|v| i64::try_from(v).ok());
            sqlx::query(
                r#"
                INSERT INTO articles
                    (url, title, source_name, published_at, view_count,
                     content, summary, section, collected_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    source_name = excluded.source_name,
                    published_at = excluded.published_at,
                    view_count = excluded.view_count,
                    content = excluded.content,
                    summary = excluded.summary,
                    section = excluded.section,
                    collected_at = excluded.collected_at
                "#,
            )
            .bind(&article.url)
            .bind(&article.title)
            .bind(&article.source_name)
            .bind(article.published_at.map(|p| p.to_rfc3339()))
            .bind(view_count)
            .bind(&article.content)
            .bind(article.summary.as_deref())
            .bind(article.section.as_deref())
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(articles.len())
    }

    /// Records one run: fetch status for every source, then its articles.
    pub async fn record_run(&self, digest: &Digest) -> anyhow::Result<usize> {
        for report in &digest.reports {
            self.update_source_fetched(&report.source_name, report.error.as_deref())
                .await?;
        }
        let articles: Vec<ArticleRecord> = digest.articles().cloned().collect();
        self.save_articles(&articles).await
    }

    pub async fn recent_articles(&self, limit: i64) -> anyhow::Result<Vec<StoredArticle>> {
        let articles = sqlx::query_as::<_, StoredArticle>(
            r#"
            SELECT * FROM articles
            ORDER BY collected_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    pub async fn article_count(&self) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceMethod;
    use chrono::TimeZone;

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn feed_config(name: &str, url: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            method: SourceMethod::Feed {
                feed_url: url.to_string(),
            },
        }
    }

    impl Database {
        async fn get_article(&self, url: &str) -> anyhow::Result<Option<StoredArticle>> {
            let article =
                sqlx::query_as::<_, StoredArticle>("SELECT * FROM articles WHERE url = ?")
                    .bind(url)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(article)
        }
    }

    fn article(url: &str, title: &str) -> ArticleRecord {
        ArticleRecord {
            source_name: "Feed".to_string(),
            ..ArticleRecord::new(title, url)
        }
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn test_database_initialization() {
            let db = create_test_db().await;
            assert!(db.get_all_sources().await.unwrap().is_empty());
            assert_eq!(db.article_count().await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_double_initialization_is_safe() {
            let db = create_test_db().await;
            assert!(db.initialize().await.is_ok());
        }
    }

    mod source_tests {
        use super::*;

        #[tokio::test]
        async fn test_sync_sources() {
            let db = create_test_db().await;
            db.sync_sources(&[
                feed_config("A", "https://a.com/rss"),
                feed_config("B", "https://b.com/rss"),
            ])
            .await
            .unwrap();

            let sources = db.get_all_sources().await.unwrap();
            assert_eq!(sources.len(), 2);
            assert_eq!(sources[0].name, "A");
            assert_eq!(sources[0].method, "rss");
        }

        #[tokio::test]
        async fn test_sync_is_idempotent() {
            let db = create_test_db().await;
            let configs = vec![feed_config("A", "https://a.com/rss")];
            db.sync_sources(&configs).await.unwrap();
            db.sync_sources(&configs).await.unwrap();

            assert_eq!(db.get_all_sources().await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_update_source_fetched_records_and_clears_error() {
            let db = create_test_db().await;
            db.sync_sources(&[feed_config("A", "https://a.com/rss")])
                .await
                .unwrap();

            db.update_source_fetched("A", Some("timeout")).await.unwrap();
            let source = db.get_source("A").await.unwrap().unwrap();
            assert!(source.last_fetched.is_some());
            assert_eq!(source.last_error, Some("timeout".to_string()));

            db.update_source_fetched("A", None).await.unwrap();
            let source = db.get_source("A").await.unwrap().unwrap();
            assert!(source.last_error.is_none());
        }

        #[tokio::test]
        async fn test_get_missing_source() {
            let db = create_test_db().await;
            assert!(db.get_source("nope").await.unwrap().is_none());
        }
    }

    mod article_tests {
        use super::*;

        #[tokio::test]
        async fn test_save_articles() {
            let db = create_test_db().await;
            let mut first = article("https://a.com/1", "First");
            first.view_count = Some(12);
            first.published_at = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
            first.summary = Some("summary".to_string());
            first.section = Some("국내 물류".to_string());

            let saved = db
                .save_articles(&[first, article("https://a.com/2", "Second")])
                .await
                .unwrap();
            assert_eq!(saved, 2);

            let stored = db.get_article("https://a.com/1").await.unwrap().unwrap();
            assert_eq!(stored.title, "First");
            assert_eq!(stored.view_count, Some(12));
            assert_eq!(
                stored.published_at.as_deref(),
                Some("2024-01-02T00:00:00+00:00")
            );
            assert_eq!(stored.section.as_deref(), Some("국내 물류"));

            let second = db.get_article("https://a.com/2").await.unwrap().unwrap();
            assert!(second.view_count.is_none());
            assert!(second.summary.is_none());
        }

        #[tokio::test]
        async fn test_save_upserts_by_url() {
            let db = create_test_db().await;
            db.save_articles(&[article("https://a.com/1", "Old title")])
                .await
                .unwrap();
            db.save_articles(&[article("https://a.com/1", "New title")])
                .await
                .unwrap();

            assert_eq!(db.article_count().await.unwrap(), 1);
            let stored = db.get_article("https://a.com/1").await.unwrap().unwrap();
            assert_eq!(stored.title, "New title");
        }

        #[tokio::test]
        async fn test_recent_articles_limit() {
            let db = create_test_db().await;
            let articles: Vec<ArticleRecord> = (1..=5)
                .map(|i| article(&format!("https://a.com/{}", i), &format!("Title {}", i)))
                .collect();
            db.save_articles(&articles).await.unwrap();

            let recent = db.recent_articles(3).await.unwrap();
            assert_eq!(recent.len(), 3);
            assert_eq!(recent[0].title, "Title 5");
        }

        #[tokio::test]
        async fn test_record_run() {
            use crate::model::Section;
            use crate::pipeline::SourceReport;

            let db = create_test_db().await;
            db.sync_sources(&[
                feed_config("Up", "https://up.com/rss"),
                feed_config("Down", "https://down.com/rss"),
            ])
            .await
            .unwrap();

            let digest = Digest {
                run_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                offset: chrono::FixedOffset::east_opt(9 * 3600).unwrap(),
                sections: vec![Section {
                    name: "국내 물류".to_string(),
                    items: vec![
                        article("https://a.com/1", "One"),
                        article("https://a.com/2", "Two"),
                    ],
                }],
                reports: vec![
                    SourceReport {
                        source_name: "Up".to_string(),
                        article_count: 2,
                        error: None,
                    },
                    SourceReport {
                        source_name: "Down".to_string(),
                        article_count: 0,
                        error: Some("https://down.com/rss returned HTTP 503".to_string()),
                    },
                ],
            };

            assert_eq!(db.record_run(&digest).await.unwrap(), 2);
            assert_eq!(db.article_count().await.unwrap(), 2);

            let up = db.get_source("Up").await.unwrap().unwrap();
            assert!(up.last_fetched.is_some());
            assert!(up.last_error.is_none());
            let down = db.get_source("Down").await.unwrap().unwrap();
            assert!(down.last_error.unwrap().contains("503"));
        }

        #[tokio::test]
        async fn test_save_nothing() {
            let db = create_test_db().await;
            assert_eq!(db.save_articles(&[]).await.unwrap(), 0);
        }
    }
}
