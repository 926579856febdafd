use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed feed (rss: {rss}; atom: {atom})")]
    Malformed {
        rss: rss::Error,
        atom: atom_syndication::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("article not found: {0}")]
    ArticleNotFound(String),
    #[error("feed not found: {0}")]
    FeedNotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("feed is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid feed url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported url scheme `{0}`, expected http or https")]
    UnsupportedScheme(String),
    #[error("a feed with id `{0}` already exists")]
    DuplicateFeed(String),
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("feed parsing error: {0}")]
    Parse(#[from] ParseError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("poller task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors of [`crate::data::DataApi`] operations that touch both the
/// configuration and the store.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
