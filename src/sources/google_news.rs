//! Google News search-feed helpers.
//!
//! Each configured query becomes one RSS fetch against the Google News
//! search endpoint, locked to the India edition. Google decorates item
//! titles with a trailing ` - Publisher` suffix and usually carries the
//! publisher in a `<source>` element as well; the element is
//! authoritative, the title suffix is the fallback.

use super::rss::FeedItem;

const SEARCH_ENDPOINT: &str = "https://news.google.com/rss/search";

/// RSS URL for one search query, India edition.
pub fn search_url(query: &str) -> String {
    format!(
        "{SEARCH_ENDPOINT}?q={}&hl=en-IN&gl=IN&ceid=IN:en",
        urlencoding::encode(query)
    )
}

/// Split a Google News item into its bare headline and publisher.
///
/// Returns `(headline, publisher)`, where the publisher is `None` when
/// neither the `<source>` element nor the title suffix identifies one.
pub fn split_headline(item: &FeedItem) -> (String, Option<String>) {
    let title = item.title.trim();
    let source = item.source_name.trim();
    if !source.is_empty() {
        let headline = title
            .strip_suffix(&format!(" - {source}"))
            .unwrap_or(title)
            .to_string();
        return (headline, Some(source.to_string()));
    }
    match title.rsplit_once(" - ") {
        Some((headline, publisher))
            if !headline.trim().is_empty() && !publisher.trim().is_empty() =>
        {
            (
                headline.trim_end().to_string(),
                Some(publisher.trim().to_string()),
            )
        }
        _ => (title.to_string(), None),
    }
}
