use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SharedConfig;
use crate::error::PollError;
use crate::feed::{Article, Feed};
use crate::fetcher::Fetcher;
use crate::identity::TitleGuard;
use crate::parser::parse_feed;
use crate::storage::{feed_due_for_fetch, ArticleStore};

const MIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Period of the scheduler tick.
    pub interval: Duration,
    /// Refresh interval of feeds without an entry in `feed_refresh`.
    pub default_refresh: Duration,
    pub feed_refresh: HashMap<String, Duration>,
    /// Unsaved articles first seen longer ago than this are expired.
    pub max_age_hours: u32,
    pub max_concurrent_fetches: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            default_refresh: Duration::from_secs(600),
            feed_refresh: HashMap::new(),
            max_age_hours: 72,
            max_concurrent_fetches: 4,
        }
    }
}

impl PollConfig {
    pub fn refresh_for(&self, feed_id: &str) -> Duration {
        self.feed_refresh
            .get(feed_id)
            .copied()
            .unwrap_or(self.default_refresh)
    }
}

/// Outcome of one ingestion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Feeds fetched this cycle.
    pub due: usize,
    /// Enabled feeds not yet due.
    pub skipped: usize,
    /// Due feeds whose fetch or parse failed.
    pub failed: usize,
    pub stored: usize,
    /// Articles dropped by the title guard.
    pub duplicates: usize,
    pub expired: u64,
}

pub struct PollerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests shutdown and waits for the task. A cycle in progress runs to
    /// completion first.
    pub async fn stop(self) -> Result<(), PollError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(PollError::from)
    }
}

/// Spawns the background ingestion task. The first cycle runs immediately.
///
/// `config` is read at every tick, so feeds and refresh intervals changed
/// through [`crate::data::DataApi`] apply from the next cycle on. The tick
/// period follows [`crate::config::AppConfig::poll_config`] and is re-armed
/// when it changes.
pub fn spawn_poller(store: ArticleStore, fetcher: Fetcher, config: SharedConfig) -> PollerHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        // Scheduled tick instants map onto wall time through one fixed anchor,
        // so consecutive stamps are exactly one period apart.
        let anchor = (Utc::now(), Instant::now());
        let mut period = config.read().await.poll_config().interval.max(MIN_TICK);
        let mut ticker = ticker_at(Instant::now(), period);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("poller shutdown requested");
                    break;
                }
                scheduled = ticker.tick() => {
                    poll_shared(&store, &fetcher, &config, wall_time(anchor, scheduled)).await;

                    let next = config.read().await.poll_config().interval.max(MIN_TICK);
                    if next != period {
                        info!(from = ?period, to = ?next, "scheduler tick changed");
                        period = next;
                        ticker = ticker_at(scheduled + period, period);
                    }
                }
            }
        }
    });

    PollerHandle { cancel_tx, join }
}

fn ticker_at(start: Instant, period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn wall_time(anchor: (DateTime<Utc>, Instant), scheduled: Instant) -> DateTime<Utc> {
    let (wall, instant) = anchor;
    let elapsed = scheduled.saturating_duration_since(instant);
    wall + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
}

/// Runs one cycle as of `now` with the scheduler settings currently in
/// `config`.
pub async fn poll_shared(
    store: &ArticleStore,
    fetcher: &Fetcher,
    config: &SharedConfig,
    now: DateTime<Utc>,
) -> CycleReport {
    let poll = config.read().await.poll_config();
    poll_at(store, fetcher, &poll, now).await
}

/// Runs one cycle at the current time. See [`poll_at`].
pub async fn poll_once(store: &ArticleStore, fetcher: &Fetcher, config: &PollConfig) -> CycleReport {
    poll_at(store, fetcher, config, Utc::now()).await
}

/// Runs one cycle as of `now`: refresh every feed due at `now`, stamp each
/// attempted feed with `now`, then expire old articles.
///
/// Failures are logged per feed and per article and never stop the cycle.
pub async fn poll_at(
    store: &ArticleStore,
    fetcher: &Fetcher,
    config: &PollConfig,
    now: DateTime<Utc>,
) -> CycleReport {
    let mut report = CycleReport::default();

    match store.list_feeds(true).await {
        Ok(feeds) => {
            let mut due = Vec::new();
            for feed in feeds {
                let refresh = chrono::Duration::from_std(config.refresh_for(&feed.id))
                    .unwrap_or(chrono::Duration::MAX);
                if feed_due_for_fetch(&feed, refresh, now) {
                    due.push(feed);
                } else {
                    debug!(feed = %feed.id, "feed not due yet");
                    report.skipped += 1;
                }
            }
            report.due = due.len();

            // Fetch concurrently, persist in feed order.
            let mut results = stream::iter(due)
                .map(|feed| async move {
                    let result = fetch_articles(fetcher, &feed).await;
                    (feed, result)
                })
                .buffered(config.max_concurrent_fetches.max(1));

            while let Some((feed, result)) = results.next().await {
                match result {
                    Ok(articles) => {
                        let found = articles.len();
                        let (stored, duplicates) = store_articles(store, articles).await;
                        report.stored += stored;
                        report.duplicates += duplicates;
                        info!(feed = %feed.id, found, stored, duplicates, "refreshed feed");
                    }
                    Err(err) => {
                        report.failed += 1;
                        warn!(feed = %feed.id, url = %feed.url, error = %err, "failed to refresh feed");
                    }
                }
                // Stamped even on failure, so a broken feed is retried once
                // per interval like a healthy one.
                if let Err(err) = store.mark_feed_fetched(&feed.id, now).await {
                    warn!(feed = %feed.id, error = %err, "failed to record fetch time");
                }
            }
        }
        Err(err) => warn!(error = %err, "failed to list feeds"),
    }

    match store.expire(config.max_age_hours).await {
        Ok(expired) => {
            report.expired = expired;
            if expired > 0 {
                info!(expired, "cleaned up expired articles");
            }
        }
        Err(err) => warn!(error = %err, "failed to expire articles"),
    }

    info!(
        due = report.due,
        skipped = report.skipped,
        failed = report.failed,
        stored = report.stored,
        duplicates = report.duplicates,
        "ingestion cycle finished"
    );
    report
}

async fn fetch_articles(fetcher: &Fetcher, feed: &Feed) -> Result<Vec<Article>, PollError> {
    let bytes = fetcher.fetch(&feed.url).await?;
    let articles = parse_feed(&bytes, feed, Utc::now())?;
    Ok(articles)
}

/// Title guard, then upsert. Returns `(stored, duplicates)`.
async fn store_articles(store: &ArticleStore, articles: Vec<Article>) -> (usize, usize) {
    let mut guard = TitleGuard::new(store);
    let mut stored = 0;
    let mut duplicates = 0;

    for article in articles {
        if !guard.admit(&article.title).await {
            duplicates += 1;
            continue;
        }
        match store.upsert_article(&article).await {
            Ok(()) => stored += 1,
            Err(err) => warn!(article = %article.id, error = %err, "failed to store article"),
        }
    }
    (stored, duplicates)
}
