use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use crate::error::ConfigError;
use crate::feed::Feed;
use crate::fetcher::FetchConfig;
use crate::poller::PollConfig;
use crate::view::View;

/// Overrides the data directory, mainly for containers.
pub const DATA_DIR_ENV: &str = "NEWSROOM_DATA_DIR";

/// Configuration shared between the query facade and the scheduler.
pub type SharedConfig = Arc<RwLock<AppConfig>>;

pub fn shared_config(config: AppConfig) -> SharedConfig {
    Arc::new(RwLock::new(config))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedConfig>,
    pub blocklist: Vec<String>,
    pub ui: UiConfig,
    pub poll: PollSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_minutes: Option<u64>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    pub items_per_page: usize,
    pub default_view: View,
    pub show_filtered_count: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollSettings {
    /// Scheduler tick. Defaults to the shortest configured refresh interval.
    pub tick_minutes: Option<u64>,
    pub default_refresh_minutes: u64,
    pub expiry_hours: u32,
    pub max_concurrent_fetches: usize,
    pub request_timeout_seconds: u64,
    pub max_response_bytes: usize,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            items_per_page: 50,
            default_view: View::Latest,
            show_filtered_count: true,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            tick_minutes: None,
            default_refresh_minutes: 10,
            expiry_hours: 72,
            max_concurrent_fetches: 4,
            request_timeout_seconds: 30,
            max_response_bytes: 10 * 1024 * 1024,
            retry_attempts: 1,
            retry_backoff_ms: 1000,
            user_agent: "Newsroom/1.0".to_owned(),
        }
    }
}

impl FeedConfig {
    /// Rejects feeds with a blank required field or a non-http(s) url.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("url", &self.url),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }
        let parsed = Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::UnsupportedScheme(other.to_owned())),
        }
    }

    pub fn to_feed(&self) -> Feed {
        Feed {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            category: self.category.clone(),
            enabled: self.enabled,
            last_fetched_at: None,
        }
    }
}

impl AppConfig {
    /// Configuration shipped on first start.
    pub fn starter() -> Self {
        let feed = |id: &str, name: &str, url: &str| FeedConfig {
            id: id.to_owned(),
            name: name.to_owned(),
            url: url.to_owned(),
            category: "tech".to_owned(),
            enabled: true,
            refresh_interval_minutes: Some(10),
        };
        Self {
            feeds: vec![
                feed("hackernews", "Hacker News", "https://hnrss.org/frontpage"),
                feed("lobsters", "Lobsters", "https://lobste.rs/rss"),
            ],
            blocklist: vec!["celebrity gossip".to_owned()],
            ui: UiConfig::default(),
            poll: PollSettings::default(),
        }
    }

    /// `$NEWSROOM_DATA_DIR`, else `<config dir>/newsroom`.
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("newsroom"))
    }

    /// Reads `path`. If it is not valid JSON, the `*.json.tmp` left by an
    /// interrupted [`AppConfig::save`] is tried before giving up.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        match serde_json::from_slice(&bytes) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to parse config, trying tmp fallback");
                let tmp = std::fs::read(path.with_extension("json.tmp")).map_err(|_| err)?;
                Ok(serde_json::from_slice(&tmp)?)
            }
        }
    }

    /// Loads `path`, writing [`AppConfig::starter`] there first if it does
    /// not exist.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config not found, writing default");
                let config = Self::starter();
                config.save(path)?;
                Ok(config)
            }
            Err(err) => Err(err),
        }
    }

    /// Writes through a temp file and renames it into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        let minutes = |m: u64| Duration::from_secs(m.max(1) * 60);
        let default_refresh = minutes(self.poll.default_refresh_minutes);

        let feed_refresh: HashMap<String, Duration> = self
            .feeds
            .iter()
            .filter_map(|feed| {
                feed.refresh_interval_minutes
                    .map(|m| (feed.id.clone(), minutes(m)))
            })
            .collect();

        let interval = match self.poll.tick_minutes {
            Some(m) => minutes(m),
            None => feed_refresh
                .values()
                .copied()
                .chain(std::iter::once(default_refresh))
                .min()
                .unwrap_or(default_refresh),
        };

        if self.poll.max_concurrent_fetches == 0 {
            warn!("max_concurrent_fetches is 0, fetching sequentially");
        }

        PollConfig {
            interval,
            default_refresh,
            feed_refresh,
            max_age_hours: self.poll.expiry_hours,
            max_concurrent_fetches: self.poll.max_concurrent_fetches.max(1),
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.poll.user_agent.clone(),
            timeout: Duration::from_secs(self.poll.request_timeout_seconds),
            max_bytes: self.poll.max_response_bytes,
            max_retries: self.poll.retry_attempts,
            retry_backoff: Duration::from_millis(self.poll.retry_backoff_ms),
        }
    }
}
