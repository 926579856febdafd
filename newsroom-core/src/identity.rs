use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::storage::ArticleStore;

/// Stable article id: hex SHA-256 of `feed_url|entry_id`.
pub fn fingerprint(feed_url: &str, entry_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(feed_url.as_bytes());
    hasher.update(b"|");
    hasher.update(entry_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cross-feed dedup by exact title.
///
/// An article is rejected when any stored article, from any feed, already
/// carries the same title, or when an earlier article of the same batch did.
/// The match is exact and intentionally coarse: it drops unrelated items that
/// share a generic title ("Update") and lets through trivially reworded ones.
/// It also applies to re-fetches of an already stored entry, so content is
/// only refreshed when the title itself changed.
pub struct TitleGuard<'a> {
    store: &'a ArticleStore,
    batch: HashSet<String>,
}

impl<'a> TitleGuard<'a> {
    pub fn new(store: &'a ArticleStore) -> Self {
        Self {
            store,
            batch: HashSet::new(),
        }
    }

    /// Returns `true` when `title` may be persisted.
    ///
    /// A failed lookup is logged and admits the article.
    pub async fn admit(&mut self, title: &str) -> bool {
        if self.batch.contains(title) {
            debug!(title, "skipping duplicate title within batch");
            return false;
        }
        match self.store.title_exists(title).await {
            Ok(true) => {
                debug!(title, "skipping duplicate article");
                false
            }
            Ok(false) => {
                self.batch.insert(title.to_owned());
                true
            }
            Err(err) => {
                warn!(title, error = %err, "failed to check for duplicate article");
                self.batch.insert(title.to_owned());
                true
            }
        }
    }
}
