//! One digest cycle, end to end.
//!
//! [`run_cycle`] is the sequential heart of the program: normalize the
//! fetched batch, cap it by priority, cluster, gate against history,
//! classify, synthesize, render. It owns no I/O of its own; sources,
//! classifier, and store are injected, which keeps the cycle's
//! guarantees testable with fakes:
//!
//! - the same batch over the same starting store state renders the
//!   byte-identical digest
//! - a story surfaced in cycle N never reappears in cycle N+1
//! - a history store failure aborts the cycle before anything is delivered
//! - a classifier failure excludes one article and nothing else
//!
//! The caller runs at most one cycle at a time; nothing here defends
//! against concurrent cycles sharing a store.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::classify::{classify_all, ClassifyAsync};
use crate::cluster::cluster;
use crate::config::Config;
use crate::digest::{render, synthesize};
use crate::error::Result;
use crate::history::{filter_new, HistoryStore};
use crate::models::{Digest, NormalizedArticle, RawArticle};
use crate::normalize::normalize;
use crate::utils::time_of_day;

/// Everything one cycle produced, plus counters for logging and tests.
#[derive(Debug)]
pub struct CycleReport {
    /// The synthesized digest.
    pub digest: Digest,
    /// The digest's canonical rendered text.
    pub rendered: String,
    /// Articles in the incoming batch.
    pub fetched: usize,
    /// Clusters formed from the capped batch.
    pub clusters: usize,
    /// Clusters that survived the history gate.
    pub fresh: usize,
    /// Articles the classifier kept.
    pub relevant: usize,
}

/// Run one full pipeline cycle over an already-fetched batch.
///
/// History records for surviving clusters are written inside this call,
/// before the rendered digest is returned; the caller delivers afterwards.
/// If this returns an error, nothing must be delivered.
#[instrument(level = "info", skip_all, fields(batch = batch.len()))]
pub async fn run_cycle<C, H>(
    batch: Vec<RawArticle>,
    config: &Config,
    classifier: &C,
    store: &mut H,
    now: DateTime<Utc>,
) -> Result<CycleReport>
where
    C: ClassifyAsync,
    H: HistoryStore,
{
    let fetched = batch.len();

    // ---- Normalize ----
    let mut articles: Vec<NormalizedArticle> = batch.into_iter().map(normalize).collect();

    // ---- Cap the batch, keeping the most authoritative articles ----
    articles.sort_by_key(|article| article.raw.source_priority_tier);
    if articles.len() > config.max_batch {
        info!(
            dropped = articles.len() - config.max_batch,
            cap = config.max_batch,
            "Batch over cap; dropping lowest-priority articles"
        );
        articles.truncate(config.max_batch);
    }

    // ---- Cluster ----
    let clusters = cluster(articles, config.similarity_threshold);
    let cluster_count = clusters.len();

    // ---- History gate (records survivors before anything is delivered) ----
    let fresh = filter_new(
        clusters,
        store,
        config.similarity_threshold,
        config.fuzzy_history,
        now,
    )
    .await?;
    let fresh_count = fresh.len();

    // ---- Classify ----
    let classified = classify_all(&fresh, classifier, config.classify_concurrency).await;
    let relevant = classified.iter().filter(|article| article.relevant).count();

    // ---- Synthesize and render ----
    let edition = time_of_day(now);
    let digest = synthesize(classified, now, &edition);
    let rendered = render(&digest);

    info!(
        fetched,
        clusters = cluster_count,
        fresh = fresh_count,
        relevant,
        "Cycle complete"
    );

    Ok(CycleReport {
        digest,
        rendered,
        fetched,
        clusters: cluster_count,
        fresh: fresh_count,
        relevant,
    })
}
