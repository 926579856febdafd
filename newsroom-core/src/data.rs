use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{shared_config, AppConfig, FeedConfig, SharedConfig};
use crate::error::{ApiError, ConfigError, StoreError};
use crate::feed::{Article, Feed};
use crate::filter::Blocklist;
use crate::storage::ArticleStore;
use crate::view::{ReadFilter, View, ViewQuery};

/// Rows fetched per page request before blocklist filtering and pagination.
const QUERY_SUPERSET: u32 = 300;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// `None` uses the configured default view.
    pub view: Option<View>,
    pub feed_id: Option<String>,
    pub read: ReadFilter,
    /// 1-based.
    pub page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrontPage {
    pub articles: Vec<Article>,
    pub view: View,
    pub page: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// Articles hidden by the blocklist across the whole result, not just
    /// this page.
    pub filtered_count: usize,
    pub show_filtered_count: bool,
}

/// Entry point for a rendering layer: paged views plus the user and admin
/// actions that mutate the store or the configuration.
#[derive(Debug, Clone)]
pub struct DataApi {
    store: ArticleStore,
    config: SharedConfig,
    config_path: Option<PathBuf>,
}

impl DataApi {
    /// `config_path` is where configuration changes are written back; with
    /// `None` they stay in memory.
    pub fn new(store: ArticleStore, config: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            store,
            config: shared_config(config),
            config_path,
        }
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub async fn config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Handle for [`crate::poller::spawn_poller`], so feeds and intervals
    /// changed here reach the running scheduler.
    pub fn shared_config(&self) -> SharedConfig {
        self.config.clone()
    }

    /// Upserts every configured feed into the store. Returns how many
    /// succeeded; failures are logged.
    pub async fn sync_feeds(&self) -> usize {
        let feeds = self.config.read().await.feeds.clone();
        let mut synced = 0;
        for feed in &feeds {
            match self.store.upsert_feed(&feed.to_feed()).await {
                Ok(()) => synced += 1,
                Err(err) => warn!(feed = %feed.id, error = %err, "failed to sync feed"),
            }
        }
        info!(synced, total = feeds.len(), "synced feeds from config");
        synced
    }

    pub async fn front_page(&self, request: &PageRequest) -> Result<FrontPage, StoreError> {
        let (blocklist, per_page, default_view, show_filtered_count) = {
            let config = self.config.read().await;
            (
                Blocklist::new(&config.blocklist),
                config.ui.items_per_page.max(1),
                config.ui.default_view,
                config.ui.show_filtered_count,
            )
        };

        let view = request.view.unwrap_or(default_view);
        let mut query = ViewQuery::new(view)
            .with_read(request.read)
            .with_limit(QUERY_SUPERSET);
        if let Some(feed_id) = &request.feed_id {
            query = query.with_feed(feed_id.clone());
        }

        let rows = self.store.list_by_view(&query).await?;
        let (kept, filtered_count) = blocklist.apply(rows);

        let page = request.page.max(1);
        let start = (page - 1).saturating_mul(per_page).min(kept.len());
        let end = start.saturating_add(per_page).min(kept.len());
        let has_next = end < kept.len();
        let articles = kept.into_iter().skip(start).take(end - start).collect();

        Ok(FrontPage {
            articles,
            view,
            page,
            has_prev: page > 1,
            has_next,
            filtered_count,
            show_filtered_count,
        })
    }

    pub async fn mark_read(&self, article_id: &str) -> Result<(), StoreError> {
        self.store.mark_read(article_id).await
    }

    pub async fn mark_unread(&self, article_id: &str) -> Result<(), StoreError> {
        self.store.mark_unread(article_id).await
    }

    pub async fn toggle_saved(&self, article_id: &str) -> Result<(), StoreError> {
        self.store.toggle_saved(article_id).await
    }

    pub async fn blocklist(&self) -> Vec<String> {
        self.config.read().await.blocklist.clone()
    }

    /// Adds a phrase unless it is blank or already present (ignoring case).
    /// Returns whether the list changed.
    pub async fn add_blocked_phrase(&self, phrase: &str) -> Result<bool, ConfigError> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Ok(false);
        }
        let lower = phrase.to_lowercase();
        let mut config = self.config.write().await;
        if config.blocklist.iter().any(|p| p.to_lowercase() == lower) {
            debug!(phrase, "phrase already blocked");
            return Ok(false);
        }
        config.blocklist.push(phrase.to_owned());
        let snapshot = config.clone();
        drop(config);
        self.persist_config(snapshot).await?;
        Ok(true)
    }

    /// Removes every entry equal to `phrase` ignoring case. Returns whether
    /// the list changed.
    pub async fn remove_blocked_phrase(&self, phrase: &str) -> Result<bool, ConfigError> {
        let lower = phrase.trim().to_lowercase();
        if lower.is_empty() {
            return Ok(false);
        }
        let mut config = self.config.write().await;
        let before = config.blocklist.len();
        config.blocklist.retain(|p| p.to_lowercase() != lower);
        if config.blocklist.len() == before {
            return Ok(false);
        }
        let snapshot = config.clone();
        drop(config);
        self.persist_config(snapshot).await?;
        Ok(true)
    }

    pub async fn list_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        self.store.list_feeds(false).await
    }

    /// Validates and registers a new feed in both the store and the
    /// configuration.
    pub async fn add_feed(&self, feed: FeedConfig) -> Result<(), ApiError> {
        feed.validate()?;
        let mut config = self.config.write().await;
        if config.feeds.iter().any(|existing| existing.id == feed.id) {
            return Err(ConfigError::DuplicateFeed(feed.id).into());
        }
        self.store.upsert_feed(&feed.to_feed()).await?;
        info!(feed = %feed.id, url = %feed.url, "added feed");
        config.feeds.push(feed);
        let snapshot = config.clone();
        drop(config);
        self.persist_config(snapshot).await?;
        Ok(())
    }

    /// Flips a feed's `enabled` flag. Returns the new value.
    pub async fn toggle_feed(&self, feed_id: &str) -> Result<bool, ApiError> {
        let feed = self.store.get_feed(feed_id).await?;
        let enabled = !feed.enabled;
        self.store.set_feed_enabled(feed_id, enabled).await?;

        let mut config = self.config.write().await;
        if let Some(entry) = config.feeds.iter_mut().find(|entry| entry.id == feed_id) {
            entry.enabled = enabled;
        }
        let snapshot = config.clone();
        drop(config);
        self.persist_config(snapshot).await?;
        Ok(enabled)
    }

    async fn persist_config(&self, config: AppConfig) -> Result<(), ConfigError> {
        let Some(path) = self.config_path.clone() else {
            debug!("config has no backing file; skipping persist");
            return Ok(());
        };
        tokio::task::spawn_blocking(move || config.save(path))
            .await
            .map_err(|err| ConfigError::Io(std::io::Error::other(err)))?
    }
}
