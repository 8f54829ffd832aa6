//! Article acquisition from the configured sources.
//!
//! # Architecture
//!
//! Two kinds of source feed the pipeline: curated RSS feeds (official
//! outlets and the major papers) and Google News search queries that
//! widen coverage to institutional sites without their own usable feeds.
//! Every source resolves to one RSS document; fetches fan out over a
//! bounded `buffer_unordered` window and a failed or unparseable source
//! is logged and skipped rather than failing the cycle. Only an HTTP
//! client that cannot be built at all is a hard error.
//!
//! Items without a link are dropped, links are deduplicated across all
//! sources, and every article is stamped with its priority tier from the
//! host table before anything downstream sees it.

pub mod google_news;
pub mod rss;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use itertools::Itertools;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::RawArticle;
use rss::FeedItem;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const FETCH_TIMEOUT_SECS: u64 = 10;
const FETCH_CONCURRENCY: usize = 6;

/// Whether a fetch job came from the curated feed list or a search query.
/// Google items need headline/publisher splitting; curated items do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Curated,
    GoogleQuery,
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

async fn fetch_feed(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| Error::Feed {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Feed {
            url: url.to_string(),
            message: format!("status {status}"),
        });
    }
    response.text().await.map_err(|e| Error::Feed {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Turn parsed feed items into articles.
///
/// `label` is the feed's display name for curated sources and the query
/// string for Google searches; it becomes the `source_id` when the item
/// itself names no publisher. Items without a link are skipped and
/// unparseable timestamps fall back to the cycle time.
fn articles_from_items(
    items: Vec<FeedItem>,
    label: &str,
    kind: SourceKind,
    config: &Config,
    now: DateTime<Utc>,
) -> Vec<RawArticle> {
    let mut articles = Vec::new();
    for item in items {
        if item.link.is_empty() {
            debug!(source = %label, title = %item.title, "Skipping item without a link");
            continue;
        }
        let (title, source_id) = match kind {
            SourceKind::Curated => (item.title.clone(), label.to_string()),
            SourceKind::GoogleQuery => {
                let (headline, publisher) = google_news::split_headline(&item);
                (headline, publisher.unwrap_or_else(|| label.to_string()))
            }
        };
        let published_at = rss::parse_date(&item.published).unwrap_or(now);
        articles.push(RawArticle {
            source_id,
            source_priority_tier: config.tier_for_url(&item.link),
            title,
            body_snippet: item.body,
            url: item.link,
            published_at,
        });
    }
    articles
}

/// Drop repeated URLs, keeping the first occurrence. Curated feeds and
/// Google queries regularly surface the same page.
fn dedupe_by_url(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    articles
        .into_iter()
        .unique_by(|article| article.url.clone())
        .collect()
}

/// Fetch every configured source and return the combined article batch.
#[instrument(level = "info", skip_all, fields(feeds = config.feeds.len(), queries = config.google_queries.len()))]
pub async fn collect_articles(config: &Config, now: DateTime<Utc>) -> Result<Vec<RawArticle>> {
    let client = http_client()?;

    let jobs: Vec<(String, String, SourceKind)> = config
        .feeds
        .iter()
        .map(|feed| (feed.name.clone(), feed.url.clone(), SourceKind::Curated))
        .chain(config.google_queries.iter().map(|query| {
            (
                query.clone(),
                google_news::search_url(query),
                SourceKind::GoogleQuery,
            )
        }))
        .collect();

    let fetched: Vec<(String, String, SourceKind, Result<String>)> = stream::iter(jobs)
        .map(|(label, url, kind)| {
            let client = client.clone();
            async move {
                let body = fetch_feed(&client, &url).await;
                (label, url, kind, body)
            }
        })
        .buffer_unordered(FETCH_CONCURRENCY)
        .collect()
        .await;

    let mut articles = Vec::new();
    for (label, url, kind, body) in fetched {
        let xml = match body {
            Ok(xml) => xml,
            Err(e) => {
                warn!(error = %e, source = %label, "Skipping unreachable source");
                continue;
            }
        };
        match rss::parse_feed(&xml, &url) {
            Ok(items) => {
                let parsed = articles_from_items(items, &label, kind, config, now);
                debug!(source = %label, count = parsed.len(), "Parsed source");
                articles.extend(parsed);
            }
            Err(e) => warn!(error = %e, source = %label, "Skipping unparseable source"),
        }
    }

    let articles = dedupe_by_url(articles);
    info!(count = articles.len(), "Collected articles");
    Ok(articles)
}
