//! RSS and Atom feed parsing.
//!
//! A small streaming parser over `quick_xml` events. It recognizes both
//! RSS `<item>` and Atom `<entry>` containers and collects the handful of
//! fields the pipeline cares about; everything else in the document is
//! skipped. Feeds in the wild mix escaped text, CDATA islands, and entity
//! references inside the same element, so all three append into the same
//! field buffer.
//!
//! Ill-formed XML fails the whole feed. The caller treats that as a
//! transient source error and moves on to the next feed.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

/// One item lifted out of a feed, fields still raw.
#[derive(Debug, Default, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub body: String,
    pub published: String,
    /// Publisher name from an RSS `<source>` element, when present.
    pub source_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Title,
    Link,
    Body,
    Published,
    Source,
}

impl FeedItem {
    fn buffer_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::None => None,
            Field::Title => Some(&mut self.title),
            Field::Link => Some(&mut self.link),
            Field::Body => Some(&mut self.body),
            Field::Published => Some(&mut self.published),
            Field::Source => Some(&mut self.source_name),
        }
    }

    fn trimmed(mut self) -> Self {
        for field in [
            &mut self.title,
            &mut self.link,
            &mut self.body,
            &mut self.published,
            &mut self.source_name,
        ] {
            let clean = field.trim().to_string();
            *field = clean;
        }
        self
    }
}

fn feed_error(url: &str, message: impl std::fmt::Display) -> Error {
    Error::Feed {
        url: url.to_string(),
        message: message.to_string(),
    }
}

/// Parse an RSS or Atom document into its items.
///
/// `feed_url` only labels errors; nothing is fetched here.
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current = FeedItem::default();
    let mut in_item = false;
    let mut field = Field::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" | b"entry" => {
                    in_item = true;
                    current = FeedItem::default();
                    field = Field::None;
                }
                name if in_item => {
                    field = match name {
                        b"title" => Field::Title,
                        b"link" => Field::Link,
                        b"description" | b"summary" | b"content:encoded" => Field::Body,
                        b"pubDate" | b"published" | b"updated" => Field::Published,
                        b"source" => Field::Source,
                        _ => Field::None,
                    };
                    // A repeated field (description then content:encoded)
                    // appends with a separating space.
                    if let Some(buf) = current.buffer_mut(field) {
                        if !buf.is_empty() {
                            buf.push(' ');
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if in_item && e.name().as_ref() == b"link" => {
                // Atom-style <link href="..."/>; keep the first one.
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"href" && current.link.is_empty() {
                        if let Ok(value) = attr.unescape_value() {
                            current.link = value.to_string();
                        }
                    }
                }
            }
            Ok(Event::Text(e)) if in_item => {
                if let Some(buf) = current.buffer_mut(field) {
                    let text = e.decode().map_err(|e| feed_error(feed_url, e))?;
                    buf.push_str(&text);
                }
            }
            Ok(Event::CData(e)) if in_item => {
                if let Some(buf) = current.buffer_mut(field) {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) if in_item => {
                if let Some(buf) = current.buffer_mut(field) {
                    if let Some(ch) = e.resolve_char_ref().map_err(|e| feed_error(feed_url, e))? {
                        buf.push(ch);
                    } else {
                        match e.decode().map_err(|e| feed_error(feed_url, e))?.as_ref() {
                            "amp" => buf.push('&'),
                            "lt" => buf.push('<'),
                            "gt" => buf.push('>'),
                            "apos" => buf.push('\''),
                            "quot" => buf.push('"'),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" | b"entry" => {
                    in_item = false;
                    items.push(std::mem::take(&mut current).trimmed());
                }
                _ if in_item => field = Field::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(feed_error(feed_url, e)),
        }
    }

    Ok(items)
}

/// Parse a feed timestamp. RSS uses RFC 2822, Atom uses RFC 3339; anything
/// else is `None` and the caller substitutes the cycle time.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rss_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Press Information Bureau</title>
    <item>
      <title>Cabinet approves new metro corridor</title>
      <link>https://pib.gov.in/PressRelease.aspx?id=1</link>
      <description>The Union Cabinet today approved a metro corridor.</description>
      <pubDate>Tue, 20 May 2025 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>RBI releases annual report</title>
      <link>https://pib.gov.in/PressRelease.aspx?id=2</link>
      <description>Highlights from the annual report.</description>
      <pubDate>Tue, 20 May 2025 11:00:00 +0530</pubDate>
    </item>
  </channel>
</rss>"#;
        let items = parse_feed(xml, "https://pib.gov.in/rss").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Cabinet approves new metro corridor");
        assert_eq!(items[0].link, "https://pib.gov.in/PressRelease.aspx?id=1");
        assert_eq!(
            items[0].body,
            "The Union Cabinet today approved a metro corridor."
        );
        assert_eq!(items[1].published, "Tue, 20 May 2025 11:00:00 +0530");
    }

    #[test]
    fn test_parse_cdata_and_entities() {
        let xml = r#"<rss><channel>
  <item>
    <title>AT&amp;T expands India operations</title>
    <link>https://example.com/a</link>
    <description><![CDATA[Deal worth <b>$2 billion</b> &amp; counting]]></description>
  </item>
</channel></rss>"#;
        let items = parse_feed(xml, "https://example.com/rss").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "AT&T expands India operations");
        assert_eq!(items[0].body, "Deal worth <b>$2 billion</b> &amp; counting");
    }

    #[test]
    fn test_parse_atom_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Ministry feed</title>
  <entry>
    <title>Joint statement on trade talks</title>
    <link href="https://mea.gov.in/press/42"/>
    <summary>Both sides agreed to continue negotiations.</summary>
    <updated>2025-05-20T09:30:00Z</updated>
  </entry>
</feed>"#;
        let items = parse_feed(xml, "https://mea.gov.in/atom").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Joint statement on trade talks");
        assert_eq!(items[0].link, "https://mea.gov.in/press/42");
        assert_eq!(items[0].published, "2025-05-20T09:30:00Z");
    }

    #[test]
    fn test_source_element_captured() {
        let xml = r#"<rss><channel>
  <item>
    <title>ISRO launch window confirmed - The Hindu</title>
    <link>https://news.google.com/rss/articles/abc</link>
    <source url="https://www.thehindu.com">The Hindu</source>
  </item>
</channel></rss>"#;
        let items = parse_feed(xml, "https://news.google.com/rss/search").unwrap();
        assert_eq!(items[0].source_name, "The Hindu");
    }

    #[test]
    fn test_channel_metadata_not_captured_as_item() {
        let xml = r#"<rss><channel>
  <title>Feed title</title>
  <link>https://example.com</link>
</channel></rss>"#;
        let items = parse_feed(xml, "https://example.com/rss").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_missing_fields_stay_empty() {
        let xml = r#"<rss><channel><item><title>No link here</title></item></channel></rss>"#;
        let items = parse_feed(xml, "https://example.com/rss").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "");
        assert_eq!(items[0].published, "");
    }

    #[test]
    fn test_mismatched_tags_fail_the_feed() {
        let xml = r#"<rss><channel><item><title>Oops</link></item></channel></rss>"#;
        let result = parse_feed(xml, "https://example.com/rss");
        assert!(matches!(result, Err(Error::Feed { .. })));
    }

    #[test]
    fn test_parse_date_formats() {
        let rfc2822 = parse_date("Tue, 20 May 2025 09:30:00 +0530").unwrap();
        assert_eq!(
            rfc2822,
            Utc.with_ymd_and_hms(2025, 5, 20, 4, 0, 0).unwrap()
        );
        let gmt = parse_date("Tue, 20 May 2025 09:30:00 GMT").unwrap();
        assert_eq!(gmt, Utc.with_ymd_and_hms(2025, 5, 20, 9, 30, 0).unwrap());
        let rfc3339 = parse_date("2025-05-20T09:30:00+05:30").unwrap();
        assert_eq!(rfc3339, Utc.with_ymd_and_hms(2025, 5, 20, 4, 0, 0).unwrap());
        assert!(parse_date("yesterday evening").is_none());
        assert!(parse_date("").is_none());
    }
}
