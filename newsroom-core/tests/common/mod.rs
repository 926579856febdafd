#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use newsroom_core::{fingerprint, Article, ArticleStore, Feed, FetchConfig, Fetcher};

pub async fn memory_store() -> ArticleStore {
    ArticleStore::open_in_memory()
        .await
        .expect("open in-memory store")
}

pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

pub async fn seed_feed(store: &ArticleStore, id: &str, url: &str) -> Feed {
    let feed = Feed::new(id, format!("Feed {id}"), url, "news");
    store.upsert_feed(&feed).await.expect("seed feed");
    feed
}

pub fn article(feed: &Feed, guid: &str, title: &str) -> Article {
    let now = now();
    Article {
        id: fingerprint(&feed.url, guid),
        feed_id: feed.id.clone(),
        title: title.to_owned(),
        url: format!("{}/{guid}", feed.url),
        summary: format!("summary of {title}"),
        content: format!("content of {title}"),
        published_at: now,
        fetched_at: now,
        source_name: feed.name.clone(),
        categories: String::new(),
        is_read: false,
        is_saved: false,
    }
}

pub fn fetcher() -> Fetcher {
    Fetcher::new(FetchConfig {
        timeout: Duration::from_secs(2),
        max_retries: 0,
        retry_backoff: Duration::from_millis(10),
        ..FetchConfig::default()
    })
    .expect("build fetcher")
}

/// RSS 2.0 document with one item per `(guid, title)`, all published now.
pub fn rss(items: &[(&str, &str)]) -> String {
    let pub_date = now().to_rfc2822();
    let items: String = items
        .iter()
        .map(|(guid, title)| {
            format!(
                "<item><title>{title}</title><link>http://example.com/{guid}</link>\
                 <guid>{guid}</guid><pubDate>{pub_date}</pubDate>\
                 <description>About {title}</description></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test Feed</title><link>http://example.com/</link>
<description>Test description</description>{items}</channel></rss>"#
    )
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "newsroom_{label}_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
