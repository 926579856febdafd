use chrono::{DateTime, TimeZone, Utc};
use newsroom_core::{fingerprint, parse_feed, Feed, ParseError};

fn feed() -> Feed {
    Feed::new("tech", "Tech Daily", "https://tech.example/rss", "tech")
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 21, 12, 0, 0).unwrap()
}

fn channel(items: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Tech Daily</title>
    <link>https://tech.example/</link>
    <description>All the news</description>
    {items}
  </channel>
</rss>"#
    )
}

#[test]
fn rss_item_maps_onto_article() {
    let xml = channel(
        r#"<item>
             <title>Rust 2.0 announced</title>
             <link>https://tech.example/rust-2</link>
             <guid>tag:tech.example,2024:1</guid>
             <pubDate>Mon, 21 Oct 2024 07:28:00 GMT</pubDate>
             <description>Short version</description>
             <category>programming</category>
             <category>rust</category>
           </item>"#,
    );

    let articles = parse_feed(xml.as_bytes(), &feed(), fixed_now()).unwrap();
    assert_eq!(articles.len(), 1);
    let article = &articles[0];

    assert_eq!(
        article.id,
        fingerprint("https://tech.example/rss", "tag:tech.example,2024:1")
    );
    assert_eq!(article.feed_id, "tech");
    assert_eq!(article.source_name, "Tech Daily");
    assert_eq!(article.title, "Rust 2.0 announced");
    assert_eq!(article.url, "https://tech.example/rust-2");
    assert_eq!(
        article.published_at,
        Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap()
    );
    assert_eq!(article.fetched_at, fixed_now());
    assert_eq!(article.categories, "programming, rust");
    assert!(!article.is_read && !article.is_saved);
}

#[test]
fn missing_guid_falls_back_to_link() {
    let xml = channel(
        r#"<item><title>No guid</title><link>https://tech.example/no-guid</link></item>
           <item><title>Empty guid</title><link>https://tech.example/empty</link><guid></guid></item>"#,
    );

    let articles = parse_feed(xml.as_bytes(), &feed(), fixed_now()).unwrap();
    assert_eq!(
        articles[0].id,
        fingerprint("https://tech.example/rss", "https://tech.example/no-guid")
    );
    assert_eq!(
        articles[1].id,
        fingerprint("https://tech.example/rss", "https://tech.example/empty")
    );
}

#[test]
fn entry_without_guid_or_link_is_kept() {
    let xml = channel(r#"<item><title>Orphan</title><description>text</description></item>"#);

    let articles = parse_feed(xml.as_bytes(), &feed(), fixed_now()).unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].url, "");
    assert_eq!(articles[0].id, fingerprint("https://tech.example/rss", ""));
}

#[test]
fn publish_time_falls_back_to_dublin_core_date_then_now() {
    let xml = channel(
        r#"<item><title>Dated</title><guid>a</guid><dc:date>2024-10-20T09:15:00Z</dc:date></item>
           <item><title>Undated</title><guid>b</guid></item>
           <item><title>Garbage date</title><guid>c</guid><pubDate>yesterday-ish</pubDate></item>"#,
    );

    let articles = parse_feed(xml.as_bytes(), &feed(), fixed_now()).unwrap();
    assert_eq!(
        articles[0].published_at,
        Utc.with_ymd_and_hms(2024, 10, 20, 9, 15, 0).unwrap()
    );
    assert_eq!(articles[1].published_at, fixed_now());
    assert_eq!(articles[2].published_at, fixed_now());
}

#[test]
fn summary_and_content_fill_each_other() {
    let xml = channel(
        r#"<item><title>Both</title><guid>1</guid>
             <description>teaser</description>
             <content:encoded><![CDATA[<p>full body</p>]]></content:encoded></item>
           <item><title>Description only</title><guid>2</guid><description>just this</description></item>
           <item><title>Content only</title><guid>3</guid>
             <content:encoded><![CDATA[<p>body</p>]]></content:encoded></item>
           <item><title>Neither</title><guid>4</guid></item>"#,
    );

    let articles = parse_feed(xml.as_bytes(), &feed(), fixed_now()).unwrap();
    assert_eq!(articles[0].summary, "teaser");
    assert_eq!(articles[0].content, "<p>full body</p>");
    assert_eq!(articles[1].summary, "just this");
    assert_eq!(articles[1].content, "just this");
    assert_eq!(articles[2].summary, "<p>body</p>");
    assert_eq!(articles[2].content, "<p>body</p>");
    assert_eq!(articles[3].summary, "");
    assert_eq!(articles[3].content, "");
}

#[test]
fn atom_feed_is_parsed_when_rss_fails() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-10-21T10:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <link rel="alternate" href="https://atom.example/entry"/>
    <link rel="edit" href="https://atom.example/edit"/>
    <published>2024-10-21T08:00:00Z</published>
    <updated>2024-10-21T09:00:00Z</updated>
    <summary>Atom summary</summary>
    <content type="html">Atom content</content>
    <category term="science"/>
  </entry>
  <entry>
    <title>Updated only</title>
    <id>urn:entry:2</id>
    <link href="https://atom.example/two"/>
    <updated>2024-10-20T06:30:00Z</updated>
  </entry>
</feed>"#;

    let articles = parse_feed(xml.as_bytes(), &feed(), fixed_now()).unwrap();
    assert_eq!(articles.len(), 2);

    let first = &articles[0];
    assert_eq!(
        first.id,
        fingerprint(
            "https://tech.example/rss",
            "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a"
        )
    );
    assert_eq!(first.url, "https://atom.example/entry");
    assert_eq!(
        first.published_at,
        Utc.with_ymd_and_hms(2024, 10, 21, 8, 0, 0).unwrap()
    );
    assert_eq!(first.summary, "Atom summary");
    assert_eq!(first.content, "Atom content");
    assert_eq!(first.categories, "science");

    let second = &articles[1];
    assert_eq!(second.url, "https://atom.example/two");
    assert_eq!(
        second.published_at,
        Utc.with_ymd_and_hms(2024, 10, 20, 6, 30, 0).unwrap()
    );
}

#[test]
fn empty_channel_yields_no_articles() {
    let articles = parse_feed(channel("").as_bytes(), &feed(), fixed_now()).unwrap();
    assert!(articles.is_empty());
}

#[test]
fn malformed_document_is_rejected() {
    let result = parse_feed(b"this is not xml at all", &feed(), fixed_now());
    assert!(matches!(result, Err(ParseError::Malformed { .. })));
}
