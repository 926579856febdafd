use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ParseError;
use crate::feed::{Article, Feed};
use crate::identity::fingerprint;

/// Raw fields of one entry, before normalization. Both RSS items and Atom
/// entries are mapped onto this shape.
#[derive(Debug, Default)]
struct RawEntry {
    guid: Option<String>,
    link: Option<String>,
    title: Option<String>,
    published: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    description: Option<String>,
    content: Option<String>,
    categories: Vec<String>,
}

/// Parses an RSS 2.0 or Atom document into articles belonging to `feed`.
///
/// `now` is used as the first-seen time of every article and as the publish
/// time of entries that carry no date at all.
pub fn parse_feed(bytes: &[u8], feed: &Feed, now: DateTime<Utc>) -> Result<Vec<Article>, ParseError> {
    let entries = match rss::Channel::read_from(bytes) {
        Ok(channel) => channel.items().iter().map(from_rss_item).collect::<Vec<_>>(),
        Err(rss) => match atom_syndication::Feed::read_from(bytes) {
            Ok(atom) => atom.entries().iter().map(from_atom_entry).collect(),
            Err(atom) => return Err(ParseError::Malformed { rss, atom }),
        },
    };
    debug!(feed = %feed.id, entries = entries.len(), "parsed feed");

    Ok(entries
        .into_iter()
        .map(|entry| normalize(entry, feed, now))
        .collect())
}

fn normalize(entry: RawEntry, feed: &Feed, now: DateTime<Utc>) -> Article {
    let link = entry.link.unwrap_or_default();
    let entry_id = match entry.guid {
        Some(guid) if !guid.is_empty() => guid,
        _ => link.clone(),
    };
    let published_at = entry.published.or(entry.updated).unwrap_or(now);

    let (summary, content) = match (entry.description, entry.content) {
        (Some(description), Some(content)) => (description, content),
        (Some(description), None) => (description.clone(), description),
        (None, Some(content)) => (content.clone(), content),
        (None, None) => (String::new(), String::new()),
    };

    Article {
        id: fingerprint(&feed.url, &entry_id),
        feed_id: feed.id.clone(),
        title: entry.title.unwrap_or_default(),
        url: link,
        summary,
        content,
        published_at,
        fetched_at: now,
        source_name: feed.name.clone(),
        categories: entry.categories.join(", "),
        is_read: false,
        is_saved: false,
    }
}

fn from_rss_item(item: &rss::Item) -> RawEntry {
    let updated = item
        .dublin_core_ext()
        .and_then(|dc| dc.dates().first())
        .and_then(|value| parse_date(value));

    RawEntry {
        guid: item.guid().map(|guid| guid.value().to_owned()),
        link: item.link().map(ToOwned::to_owned),
        title: item.title().map(ToOwned::to_owned),
        published: item.pub_date().and_then(parse_date),
        updated,
        description: non_empty(item.description()),
        content: non_empty(item.content()),
        categories: item
            .categories()
            .iter()
            .map(|category| category.name().to_owned())
            .collect(),
    }
}

fn from_atom_entry(entry: &atom_syndication::Entry) -> RawEntry {
    let link = entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|link| link.href().to_owned());

    // atom_syndication fills a missing <updated> with the Unix epoch.
    let updated = Some(entry.updated().with_timezone(&Utc)).filter(|dt| dt.timestamp() != 0);

    RawEntry {
        guid: Some(entry.id().to_owned()),
        link,
        title: Some(entry.title().value.clone()),
        published: entry.published().map(|dt| dt.with_timezone(&Utc)),
        updated,
        description: non_empty(entry.summary().map(|text| text.value.as_str())),
        content: non_empty(entry.content().and_then(|content| content.value())),
        categories: entry
            .categories()
            .iter()
            .map(|category| category.term().to_owned())
            .collect(),
    }
}

/// RSS 2.0 mandates RFC 2822 dates, but RFC 3339 shows up in the wild and in
/// Dublin Core dates.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(ToOwned::to_owned)
}
