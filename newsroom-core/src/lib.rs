pub mod config;
pub mod data;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod filter;
pub mod identity;
pub mod parser;
pub mod poller;
pub mod storage;
pub mod view;

pub use config::{shared_config, AppConfig, FeedConfig, PollSettings, SharedConfig, UiConfig};
pub use data::{DataApi, FrontPage, PageRequest};
pub use error::{ApiError, ConfigError, FetchError, ParseError, PollError, StoreError};
pub use feed::{Article, Feed};
pub use fetcher::{FetchConfig, Fetcher};
pub use filter::{filter_articles, Blocklist};
pub use identity::{fingerprint, TitleGuard};
pub use parser::parse_feed;
pub use poller::{poll_at, poll_once, poll_shared, spawn_poller, CycleReport, PollConfig, PollerHandle};
pub use storage::{feed_due_for_fetch, ArticleStore};
pub use view::{ReadFilter, View, ViewQuery};
