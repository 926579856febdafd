use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A configured source. `id` is assigned by the operator, not derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Feed {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    pub enabled: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            category: category.into(),
            enabled: true,
            last_fetched_at: None,
        }
    }

    /// A feed is due when it has never been fetched or `interval` has
    /// elapsed since the last attempt.
    pub fn is_due(&self, interval: Duration, now: DateTime<Utc>) -> bool {
        match self.last_fetched_at {
            None => true,
            Some(last) => now - last >= interval,
        }
    }
}

/// A normalized item. `id` is the fingerprint of `(feed url, entry id)`,
/// see [`crate::identity::fingerprint`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Article {
    pub id: String,
    pub feed_id: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    /// First time the article was seen. Anchors expiry.
    pub fetched_at: DateTime<Utc>,
    pub source_name: String,
    /// Comma separated entry categories.
    pub categories: String,
    pub is_read: bool,
    pub is_saved: bool,
}
