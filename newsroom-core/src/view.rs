use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Named time window over the article table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Last three days.
    #[default]
    Latest,
    /// Local midnight until now.
    Today,
    /// Last seven days.
    Week,
    /// Saved articles, no time window.
    Saved,
}

impl View {
    /// Lower bound on `published_at`, or `None` when the view has no window.
    pub fn window_start(self, now: DateTime<Local>) -> Option<DateTime<Utc>> {
        match self {
            View::Latest => Some((now - Duration::days(3)).with_timezone(&Utc)),
            View::Today => Some(start_of_local_day(now)),
            View::Week => Some((now - Duration::days(7)).with_timezone(&Utc)),
            View::Saved => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            View::Latest => "latest",
            View::Today => "today",
            View::Week => "week",
            View::Saved => "saved",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for View {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(View::Latest),
            "today" => Ok(View::Today),
            "week" => Ok(View::Week),
            "saved" => Ok(View::Saved),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl FromStr for ReadFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ReadFilter::All),
            "read" => Ok(ReadFilter::Read),
            "unread" => Ok(ReadFilter::Unread),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Arguments of [`crate::storage::ArticleStore::list_by_view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub view: View,
    /// Restrict to one feed. `None` means every feed.
    pub feed_id: Option<String>,
    pub read: ReadFilter,
    pub limit: u32,
}

impl ViewQuery {
    pub fn new(view: View) -> Self {
        Self {
            view,
            feed_id: None,
            read: ReadFilter::All,
            limit: 50,
        }
    }

    /// Accepts the rendering layer's convention where an empty id or `"all"`
    /// means no feed restriction.
    pub fn with_feed(mut self, feed_id: impl Into<String>) -> Self {
        let feed_id = feed_id.into();
        self.feed_id = match feed_id.as_str() {
            "" | "all" => None,
            _ => Some(feed_id),
        };
        self
    }

    pub fn with_read(mut self, read: ReadFilter) -> Self {
        self.read = read;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Local midnight of the day containing `now`, in UTC.
pub fn start_of_local_day(now: DateTime<Local>) -> DateTime<Utc> {
    start_of_day(&now)
}

/// First instant of the calendar day containing `now` in its own time zone.
/// When a DST gap swallows midnight, that is the end of the gap.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    (0..MINUTES_PER_DAY)
        .find_map(|minute| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minute)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}
