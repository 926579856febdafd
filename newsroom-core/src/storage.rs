use std::path::Path;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::feed::{Article, Feed};
use crate::view::{ReadFilter, View, ViewQuery};

const ARTICLE_COLUMNS: &str = "id, feed_id, title, url, summary, content, published_at, \
     fetched_at, source_name, categories, is_read, is_saved";

/// Handle to the SQLite database holding feeds and articles.
///
/// Cloning is cheap and shares the underlying pool. Every write is a single
/// statement, so SQLite's own locking keeps rows whole under concurrent use.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(StdDuration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!(path = %path.as_ref().display(), "opened article store");
        Self::migrate(pool).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Each connection to :memory: is its own database, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Inserts a feed or replaces its descriptive fields. `last_fetched_at`
    /// never moves backwards, so a config sync does not reset the fetch gate.
    pub async fn upsert_feed(&self, feed: &Feed) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO feeds (id, name, url, category, enabled, last_fetched_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                category = excluded.category,
                enabled = excluded.enabled,
                last_fetched_at = CASE
                    WHEN feeds.last_fetched_at IS NULL THEN excluded.last_fetched_at
                    WHEN excluded.last_fetched_at > feeds.last_fetched_at THEN excluded.last_fetched_at
                    ELSE feeds.last_fetched_at
                END
            "#,
        )
        .bind(&feed.id)
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(&feed.category)
        .bind(feed.enabled)
        .bind(feed.last_fetched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_feeds(&self, enabled_only: bool) -> Result<Vec<Feed>, StoreError> {
        let sql = if enabled_only {
            "SELECT id, name, url, category, enabled, last_fetched_at FROM feeds WHERE enabled = 1 ORDER BY name"
        } else {
            "SELECT id, name, url, category, enabled, last_fetched_at FROM feeds ORDER BY name"
        };
        let feeds = sqlx::query_as::<_, Feed>(sql).fetch_all(&self.pool).await?;
        Ok(feeds)
    }

    pub async fn get_feed(&self, id: &str) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, Feed>(
            "SELECT id, name, url, category, enabled, last_fetched_at FROM feeds WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::FeedNotFound(id.to_owned()))
    }

    pub async fn set_feed_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE feeds SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::FeedNotFound(id.to_owned()));
        }
        Ok(())
    }

    /// Records a fetch attempt. Returns `false` when `at` is not later than
    /// the stored timestamp (or the feed does not exist).
    pub async fn mark_feed_fetched(&self, id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE feeds SET last_fetched_at = ?1
            WHERE id = ?2 AND (last_fetched_at IS NULL OR last_fetched_at < ?1)
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts an article, or refreshes its content when the id exists.
    ///
    /// On conflict `fetched_at` keeps the stored value, and `is_read` /
    /// `is_saved` keep the stored value unless the incoming row sets them.
    pub async fn upsert_article(&self, article: &Article) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO articles (id, feed_id, title, url, summary, content, published_at,
                                  fetched_at, source_name, categories, is_read, is_saved)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                summary = excluded.summary,
                content = excluded.content,
                published_at = excluded.published_at,
                source_name = excluded.source_name,
                categories = excluded.categories,
                is_read = CASE WHEN excluded.is_read THEN 1 ELSE articles.is_read END,
                is_saved = CASE WHEN excluded.is_saved THEN 1 ELSE articles.is_saved END
            "#,
        )
        .bind(&article.id)
        .bind(&article.feed_id)
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(article.published_at)
        .bind(article.fetched_at)
        .bind(&article.source_name)
        .bind(&article.categories)
        .bind(article.is_read)
        .bind(article.is_saved)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn title_exists(&self, title: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE title = ?")
            .bind(title)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, StoreError> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::ArticleNotFound(id.to_owned()))
    }

    /// Articles in the query's window, unread first, then newest first.
    pub async fn list_by_view(&self, query: &ViewQuery) -> Result<Vec<Article>, StoreError> {
        self.list_by_view_at(query, Local::now()).await
    }

    pub async fn list_by_view_at(
        &self,
        query: &ViewQuery,
        now: DateTime<Local>,
    ) -> Result<Vec<Article>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE 1 = 1"));

        if query.view == View::Saved {
            builder.push(" AND is_saved = 1");
        }
        if let Some(start) = query.view.window_start(now) {
            builder.push(" AND published_at >= ").push_bind(start);
        }
        if let Some(feed_id) = &query.feed_id {
            builder.push(" AND feed_id = ").push_bind(feed_id.clone());
        }
        match query.read {
            ReadFilter::All => {}
            ReadFilter::Read => {
                builder.push(" AND is_read = 1");
            }
            ReadFilter::Unread => {
                builder.push(" AND is_read = 0");
            }
        }
        builder
            .push(" ORDER BY is_read ASC, published_at DESC LIMIT ")
            .push_bind(i64::from(query.limit));

        let articles = builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?;
        debug!(view = %query.view, count = articles.len(), "listed articles");
        Ok(articles)
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), StoreError> {
        self.set_read(id, true).await
    }

    pub async fn mark_unread(&self, id: &str) -> Result<(), StoreError> {
        self.set_read(id, false).await
    }

    async fn set_read(&self, id: &str, read: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE articles SET is_read = ? WHERE id = ?")
            .bind(read)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ArticleNotFound(id.to_owned()));
        }
        Ok(())
    }

    /// Flips `is_saved`, leaving `is_read` untouched.
    pub async fn toggle_saved(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE articles SET is_saved = NOT is_saved WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ArticleNotFound(id.to_owned()));
        }
        Ok(())
    }

    /// Deletes unsaved articles first seen more than `max_age_hours` ago.
    pub async fn expire(&self, max_age_hours: u32) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(max_age_hours));
        self.expire_before(cutoff).await
    }

    /// Deletes unsaved articles with `fetched_at` strictly before `cutoff`.
    /// Saved articles are never deleted.
    pub async fn expire_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE is_saved = 0 AND fetched_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// True when `feed` has never been fetched or `interval` has elapsed since
/// its last fetch attempt.
pub fn feed_due_for_fetch(feed: &Feed, interval: Duration, now: DateTime<Utc>) -> bool {
    feed.is_due(interval, now)
}
