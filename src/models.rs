//! Data models for news articles and their processed representations.
//!
//! This module defines the core data structures carried through the pipeline:
//! - [`RawArticle`]: An article as produced by a source adapter
//! - [`ContentSignature`]: Order-insensitive token sets used for similarity
//!   and deduplication
//! - [`NormalizedArticle`]: A raw article plus its normalized text and signature
//! - [`StoryCluster`]: A group of articles covering the same underlying event
//! - [`ClassifiedArticle`]: A canonical article with its relevance verdict
//! - [`HistoryRecord`]: The durable trace of a story that has already been
//!   surfaced
//! - [`Digest`]: The final categorized output of one cycle
//!
//! Everything here is owned by a single cycle and rebuilt from scratch on the
//! next one; only [`HistoryRecord`]s outlive a cycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// An article as emitted by a source adapter, before any processing.
///
/// Adapters attach `source_priority_tier` at construction time: 0 for
/// official outlets (government press bureaus, regulators), rising numbers
/// for progressively less authoritative sources. Lower is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    /// Stable identifier of the producing source (e.g. "Press Information Bureau").
    pub source_id: String,
    /// Priority tier of the source; lower numbers outrank higher ones.
    pub source_priority_tier: u8,
    /// The headline as published.
    pub title: String,
    /// A snippet or summary of the article body, possibly containing markup.
    pub body_snippet: String,
    /// Link to the full article.
    pub url: String,
    /// Publication timestamp; adapters substitute the cycle start time when
    /// the feed omits one.
    pub published_at: DateTime<Utc>,
}

/// Order-insensitive token sets derived from an article's normalized text.
///
/// Two articles with identical signatures are near-duplicates regardless of
/// the order their words appeared in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSignature {
    /// Significant tokens of the normalized title.
    pub title_tokens: BTreeSet<String>,
    /// Significant tokens of the normalized body snippet.
    pub body_tokens: BTreeSet<String>,
}

impl ContentSignature {
    /// True when neither the title nor the body produced any tokens.
    pub fn is_empty(&self) -> bool {
        self.title_tokens.is_empty() && self.body_tokens.is_empty()
    }

    /// The sorted union of title and body tokens.
    pub fn sorted_tokens(&self) -> Vec<String> {
        self.title_tokens
            .union(&self.body_tokens)
            .cloned()
            .collect()
    }

    /// Stable deduplication key: lowercase hex SHA-256 over the sorted token
    /// union. Tokens are separated by a 0x1f byte so that token boundaries
    /// contribute to the hash.
    ///
    /// SHA-256 rather than the std hasher because the key is persisted in
    /// the history store and must survive restarts and library upgrades.
    pub fn dedupe_key(&self) -> String {
        let mut hasher = Sha256::new();
        for token in self.title_tokens.union(&self.body_tokens) {
            hasher.update(token.as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }
}

/// A raw article plus the derived fields the pipeline compares on.
///
/// The normalized fields exist only for comparison; rendering always uses
/// the fields of `raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedArticle {
    /// The article as the adapter produced it.
    pub raw: RawArticle,
    /// Lowercased, markup- and boilerplate-free title.
    pub normalized_title: String,
    /// Lowercased, markup- and boilerplate-free body snippet.
    pub normalized_body: String,
    /// Token signature derived from the normalized fields.
    pub content_signature: ContentSignature,
}

/// A group of articles judged to cover the same underlying event.
///
/// Clusters are ephemeral: they are rebuilt from scratch every cycle and
/// never persisted. Construction guarantees at least one member.
#[derive(Debug, Clone)]
pub struct StoryCluster {
    /// Member articles in the order they joined.
    pub members: Vec<NormalizedArticle>,
}

impl StoryCluster {
    /// Start a new cluster seeded with a single article.
    pub fn new(seed: NormalizedArticle) -> Self {
        Self {
            members: vec![seed],
        }
    }

    /// The cluster's canonical (most authoritative) member.
    ///
    /// Re-derived on every call from the full membership: the member with
    /// the lowest priority tier wins; ties break on the earliest
    /// `published_at`; remaining ties keep the earliest-joined member.
    /// Never assume the first member is canonical, since a merge may have
    /// put a higher-priority article anywhere in the list.
    pub fn canonical(&self) -> &NormalizedArticle {
        let mut best = &self.members[0];
        for candidate in &self.members[1..] {
            let best_rank = (best.raw.source_priority_tier, best.raw.published_at);
            let candidate_rank = (candidate.raw.source_priority_tier, candidate.raw.published_at);
            if candidate_rank < best_rank {
                best = candidate;
            }
        }
        best
    }
}

/// A canonical article with the relevance verdict attached.
///
/// `category` is `Some` exactly when `relevant` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedArticle {
    /// The canonical article of the cluster this verdict applies to.
    pub canonical: NormalizedArticle,
    /// Whether the story belongs in the digest.
    pub relevant: bool,
    /// Theme assigned by the classifier, present only for relevant stories.
    pub category: Option<String>,
}

/// The durable trace of a story that has already been surfaced.
///
/// `headline` and `url` are carried for operator inspection of the store;
/// `tokens` (the sorted signature union) let the gate fuzzy-match future
/// near-duplicates without re-normalizing anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Signature-derived key, see [`ContentSignature::dedupe_key`].
    pub dedupe_key: String,
    /// When the story was first recorded.
    pub first_reported_at: DateTime<Utc>,
    /// Headline of the canonical article at recording time.
    pub headline: String,
    /// Link of the canonical article at recording time.
    pub url: String,
    /// Sorted union of signature tokens, for fuzzy matching.
    pub tokens: Vec<String>,
}

/// One category section of a digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSection {
    /// The category name (e.g. "Economy & Banking").
    pub category: String,
    /// Stories in this category, most official and most recent first.
    pub items: Vec<ClassifiedArticle>,
}

/// The categorized output of one pipeline cycle.
///
/// Section order and item order are fully determined at synthesis time, so
/// rendering the same digest twice yields byte-identical text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    /// Timestamp of the cycle that produced this digest.
    pub generated_at: DateTime<Utc>,
    /// Edition label: "morning", "afternoon", or "evening".
    pub edition: String,
    /// Ordered category sections; empty when nothing new and relevant came in.
    pub sections: Vec<DigestSection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(tier: u8, minute: u32, title: &str) -> NormalizedArticle {
        NormalizedArticle {
            raw: RawArticle {
                source_id: "test".to_string(),
                source_priority_tier: tier,
                title: title.to_string(),
                body_snippet: String::new(),
                url: format!("https://example.com/{title}"),
                published_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, minute, 0).unwrap(),
            },
            normalized_title: title.to_lowercase(),
            normalized_body: String::new(),
            content_signature: ContentSignature::default(),
        }
    }

    fn signature(title: &[&str], body: &[&str]) -> ContentSignature {
        ContentSignature {
            title_tokens: title.iter().map(|t| t.to_string()).collect(),
            body_tokens: body.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_canonical_prefers_lower_tier() {
        let mut cluster = StoryCluster::new(article(1, 0, "Newspaper version"));
        cluster.members.push(article(0, 30, "Official version"));
        assert_eq!(cluster.canonical().raw.title, "Official version");
    }

    #[test]
    fn test_canonical_tie_breaks_on_earliest_publish() {
        let mut cluster = StoryCluster::new(article(1, 45, "Later"));
        cluster.members.push(article(1, 10, "Earlier"));
        assert_eq!(cluster.canonical().raw.title, "Earlier");
    }

    #[test]
    fn test_canonical_full_tie_keeps_first_member() {
        let mut cluster = StoryCluster::new(article(2, 5, "First in"));
        cluster.members.push(article(2, 5, "Second in"));
        assert_eq!(cluster.canonical().raw.title, "First in");
    }

    #[test]
    fn test_dedupe_key_is_order_insensitive() {
        let a = signature(&["scheme", "cabinet", "approves"], &[]);
        let b = signature(&["approves", "scheme", "cabinet"], &[]);
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_dedupe_key_respects_token_boundaries() {
        let a = signature(&["ab", "c"], &[]);
        let b = signature(&["a", "bc"], &[]);
        assert_ne!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_dedupe_key_merges_title_and_body_tokens() {
        let a = signature(&["cabinet"], &["scheme"]);
        let b = signature(&["cabinet", "scheme"], &[]);
        // Same union, same key: the gate keys on the story, not the field split
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_sorted_tokens_are_sorted_and_unique() {
        let sig = signature(&["zebra", "alpha"], &["alpha", "mango"]);
        assert_eq!(sig.sorted_tokens(), vec!["alpha", "mango", "zebra"]);
    }

    #[test]
    fn test_history_record_round_trip() {
        let record = HistoryRecord {
            dedupe_key: "abc123".to_string(),
            first_reported_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            headline: "Cabinet approves scheme".to_string(),
            url: "https://pib.gov.in/x".to_string(),
            tokens: vec!["approves".to_string(), "cabinet".to_string()],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: HistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dedupe_key, record.dedupe_key);
        assert_eq!(back.tokens, record.tokens);
    }

    #[test]
    fn test_digest_serialization() {
        let digest = Digest {
            generated_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            edition: "morning".to_string(),
            sections: vec![],
        };
        let json = serde_json::to_string(&digest).unwrap();
        assert!(json.contains("morning"));
        assert!(json.contains("2025-06-01"));
    }
}
