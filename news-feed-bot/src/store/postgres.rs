use crate::store::validate_feed_url;
use crate::traits::{ArticleStore, SourceProvider};
use crate::types::{Article, BotError, NewArticle, Result, Source};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Postgres-backed source list and article store.
///
/// `PgPool` handles connection management, so one `PgStore` is shared by both
/// cycles.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    /// Connect, retrying with exponential backoff until `max_elapsed` has passed.
    pub async fn connect_with_backoff(database_url: &str, max_elapsed: Duration) -> Result<Self> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(max_elapsed))
            .build();

        let db = backoff::future::retry_notify(
            policy,
            || async {
                PgPool::connect(database_url)
                    .await
                    .map_err(backoff::Error::transient)
            },
            |err, delay| warn!("Database not reachable ({}), retrying in {:?}", err, delay),
        )
        .await?;

        Ok(Self { db })
    }

    /// Create the tables if they do not exist yet.
    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS source (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                feed_url VARCHAR(2048) NOT NULL UNIQUE,
                created TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS article (
                id BIGSERIAL PRIMARY KEY,
                source_id BIGINT NOT NULL REFERENCES source (id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                published TIMESTAMPTZ NOT NULL,
                posted TIMESTAMPTZ,
                created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (source_id, link)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_article_unposted ON article (published DESC) WHERE posted IS NULL",
        )
        .execute(&self.db)
        .await?;

        info!("Database schema ready");
        Ok(())
    }

    pub async fn add_source(&self, name: &str, feed_url: &str) -> Result<i64> {
        let feed_url = validate_feed_url(feed_url)?;

        let row = sqlx::query(
            "INSERT INTO source (name, feed_url, created) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(feed_url.as_str())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        let id: i64 = row.try_get("id")?;
        info!(source_id = id, "Added source {:?}: {}", name, feed_url);
        Ok(id)
    }

    pub async fn source_by_id(&self, id: i64) -> Result<Source> {
        let row = sqlx::query("SELECT id, name, feed_url, created FROM source WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => source_from_row(&row),
            None => Err(BotError::SourceNotFound { id }),
        }
    }

    pub async fn delete_source(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM source WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::SourceNotFound { id });
        }

        info!(source_id = id, "Deleted source");
        Ok(())
    }
}

#[async_trait]
impl SourceProvider for PgStore {
    async fn sources(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query("SELECT id, name, feed_url, created FROM source ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(source_from_row).collect()
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn store(&self, article: NewArticle) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO article (source_id, title, link, summary, published)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_id, link) DO NOTHING
            "#,
        )
        .bind(article.source_id)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.summary)
        .bind(article.published)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            debug!(source_id = article.source_id, link = %article.link, "Article already stored");
        }

        Ok(())
    }

    async fn all_not_posted(&self, since: DateTime<Utc>, limit: u64) -> Result<Vec<Article>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT id, source_id, title, link, summary, published, posted, created
            FROM article
            WHERE posted IS NULL AND published >= $1
            ORDER BY published DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(article_from_row).collect()
    }

    async fn mark_posted(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE article SET posted = $1 WHERE id = $2 AND posted IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

fn source_from_row(row: &PgRow) -> Result<Source> {
    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        feed_url: row.try_get("feed_url")?,
        created: row.try_get("created")?,
    })
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        title: row.try_get("title")?,
        link: row.try_get("link")?,
        summary: row.try_get("summary")?,
        published: row.try_get("published")?,
        posted: row.try_get("posted")?,
        created: row.try_get("created")?,
    })
}
