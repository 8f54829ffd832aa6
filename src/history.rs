//! Cross-cycle story suppression.
//!
//! The history store is the only state that outlives a cycle. The gate in
//! [`filter_new`] drops every cluster whose canonical article has already
//! been surfaced, either by exact dedupe key or by fuzzy token overlap
//! against the most recent records (headlines drift between cycles;
//! "Cabinet approves scheme" and "Govt notifies scheme" should not alert
//! twice).
//!
//! Ordering contract: a surviving cluster's record is inserted **before**
//! anything is rendered or delivered. A crash between insert and delivery
//! loses one alert; the reverse order would re-alert on every delivery
//! retry. The store may therefore contain stories that were later excluded
//! by the relevance filter: the store tracks "already surfaced to the
//! pipeline", not "was relevant".
//!
//! Any store failure is fatal for the cycle: without readable history the
//! pipeline cannot promise non-duplication, so it delivers nothing.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::models::{ContentSignature, HistoryRecord, NormalizedArticle, StoryCluster};
use crate::similarity::signature_overlap;

/// How many of the newest records fuzzy lookup scans by default.
pub const DEFAULT_RECENT_WINDOW: usize = 50;

/// Durable record of stories that have already been surfaced.
///
/// Injected into the pipeline rather than reached for globally, so tests
/// can substitute [`MemoryHistory`]. `lookup_similar` is an optional
/// enhancement; the default implementation matches nothing.
pub trait HistoryStore {
    /// Find a record by exact dedupe key.
    async fn lookup(&self, key: &str) -> Result<Option<HistoryRecord>>;

    /// Find a recent record whose stored tokens overlap the signature above
    /// `threshold`. Stores without fuzzy support return `Ok(None)`.
    async fn lookup_similar(
        &self,
        _signature: &ContentSignature,
        _threshold: f64,
    ) -> Result<Option<HistoryRecord>> {
        Ok(None)
    }

    /// Persist a record. Must be durable before returning.
    async fn insert(&mut self, record: HistoryRecord) -> Result<()>;
}

fn find_exact<'a>(records: &'a [HistoryRecord], key: &str) -> Option<&'a HistoryRecord> {
    records.iter().rev().find(|record| record.dedupe_key == key)
}

fn find_similar<'a>(
    records: &'a [HistoryRecord],
    window: usize,
    signature: &ContentSignature,
    threshold: f64,
) -> Option<&'a HistoryRecord> {
    records
        .iter()
        .rev()
        .take(window)
        .find(|record| signature_overlap(signature, &record.tokens) > threshold)
}

/// History store backed by a single JSON file.
///
/// The whole record list is loaded at open and rewritten on every insert;
/// at digest scale (tens of records per cycle) that is simpler and no less
/// durable than an incremental format.
#[derive(Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    records: Vec<HistoryRecord>,
    recent_window: usize,
}

impl JsonFileHistory {
    /// Open (or create on first insert) the store at `path`.
    ///
    /// A missing file is an empty store; an unreadable or corrupt file is
    /// `Error::History`, which aborts the cycle before anything is
    /// delivered.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn open(path: PathBuf, recent_window: usize) -> Result<Self> {
        let records = match fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                Error::History(format!("corrupt history file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(Error::History(format!(
                    "cannot read history file {}: {e}",
                    path.display()
                )));
            }
        };
        info!(count = records.len(), "History store loaded");
        Ok(Self {
            path,
            records,
            recent_window,
        })
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| Error::History(format!("cannot serialize history: {e}")))?;
        fs::write(&self.path, json).await.map_err(|e| {
            Error::History(format!("cannot write history file {}: {e}", self.path.display()))
        })
    }
}

impl HistoryStore for JsonFileHistory {
    async fn lookup(&self, key: &str) -> Result<Option<HistoryRecord>> {
        Ok(find_exact(&self.records, key).cloned())
    }

    async fn lookup_similar(
        &self,
        signature: &ContentSignature,
        threshold: f64,
    ) -> Result<Option<HistoryRecord>> {
        Ok(find_similar(&self.records, self.recent_window, signature, threshold).cloned())
    }

    async fn insert(&mut self, record: HistoryRecord) -> Result<()> {
        self.records.push(record);
        self.save().await
    }
}

/// In-memory store with the same semantics as [`JsonFileHistory`], minus
/// durability. Used by tests and by `--dry-run`.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    records: Vec<HistoryRecord>,
    recent_window: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_RECENT_WINDOW)
    }

    pub fn with_window(recent_window: usize) -> Self {
        Self {
            records: Vec::new(),
            recent_window,
        }
    }

    /// Seed the store with existing records (dry runs load the on-disk
    /// history this way and then discard all writes).
    pub fn preload(records: Vec<HistoryRecord>, recent_window: usize) -> Self {
        Self {
            records,
            recent_window,
        }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryHistory {
    async fn lookup(&self, key: &str) -> Result<Option<HistoryRecord>> {
        Ok(find_exact(&self.records, key).cloned())
    }

    async fn lookup_similar(
        &self,
        signature: &ContentSignature,
        threshold: f64,
    ) -> Result<Option<HistoryRecord>> {
        Ok(find_similar(&self.records, self.recent_window, signature, threshold).cloned())
    }

    async fn insert(&mut self, record: HistoryRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

fn record_for(canonical: &NormalizedArticle, key: String, now: DateTime<Utc>) -> HistoryRecord {
    HistoryRecord {
        dedupe_key: key,
        first_reported_at: now,
        headline: canonical.raw.title.clone(),
        url: canonical.raw.url.clone(),
        tokens: canonical.content_signature.sorted_tokens(),
    }
}

/// Drop clusters whose story has already been surfaced; record the rest.
///
/// Surviving clusters are recorded immediately (write-then-deliver, see the
/// module docs). Store errors propagate and abort the cycle.
#[instrument(level = "info", skip_all, fields(clusters = clusters.len()))]
pub async fn filter_new<H: HistoryStore>(
    clusters: Vec<StoryCluster>,
    store: &mut H,
    threshold: f64,
    fuzzy: bool,
    now: DateTime<Utc>,
) -> Result<Vec<StoryCluster>> {
    let mut fresh = Vec::new();
    let mut suppressed = 0usize;

    for cluster in clusters {
        let record = {
            let canonical = cluster.canonical();
            let key = canonical.content_signature.dedupe_key();
            if store.lookup(&key).await?.is_some() {
                debug!(title = %canonical.raw.title, "Suppressed: dedupe key already recorded");
                None
            } else if fuzzy {
                match store.lookup_similar(&canonical.content_signature, threshold).await? {
                    Some(prior) => {
                        debug!(
                            title = %canonical.raw.title,
                            prior = %prior.headline,
                            "Suppressed: near-duplicate of recent story"
                        );
                        None
                    }
                    None => Some(record_for(canonical, key, now)),
                }
            } else {
                Some(record_for(canonical, key, now))
            }
        };

        match record {
            Some(record) => {
                store.insert(record).await?;
                fresh.push(cluster);
            }
            None => suppressed += 1,
        }
    }

    info!(kept = fresh.len(), suppressed, "History gate complete");
    Ok(fresh)
}
