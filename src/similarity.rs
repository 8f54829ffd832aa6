//! Pairwise article similarity.
//!
//! Scores are weighted overlap coefficients over the signature token sets:
//! title overlap carries most of the weight, body overlap the rest. Each
//! overlap is normalized by the *smaller* set, so a one-line official
//! bulletin and a long newspaper write-up of the same event still score
//! high. Token sets make the measure order-insensitive, which is what lets
//! paraphrased headlines ("Cabinet approves X scheme" / "Govt approves X
//! scheme for farmers") land above the clustering threshold.
//!
//! Guarantees, relied on by the clustering and history stages:
//! - `similarity(a, b) == similarity(b, a)`
//! - `similarity(a, a) == 1.0`, including for empty signatures
//! - results are always within `[0.0, 1.0]`

use std::collections::BTreeSet;

use crate::models::{ContentSignature, NormalizedArticle};

/// Weight of the title-token overlap. Titles are the better event signal;
/// bodies are snippets of uneven length and quality.
pub const TITLE_WEIGHT: f64 = 0.7;
/// Weight of the body-token overlap.
pub const BODY_WEIGHT: f64 = 0.3;

/// Score how likely two articles cover the same underlying event.
pub fn similarity(a: &NormalizedArticle, b: &NormalizedArticle) -> f64 {
    let title = overlap(
        &a.content_signature.title_tokens,
        &b.content_signature.title_tokens,
    );
    let body = overlap(
        &a.content_signature.body_tokens,
        &b.content_signature.body_tokens,
    );
    match (title, body) {
        (Some(t), Some(b)) => TITLE_WEIGHT * t + BODY_WEIGHT * b,
        // One field pair is uncomparable: the other carries full weight
        (Some(t), None) => t,
        (None, Some(b)) => b,
        // Nothing to compare: identical (empty) signatures are the same
        // degenerate story, anything else is unrelated
        (None, None) => {
            if a.content_signature == b.content_signature {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Overlap coefficient |A ∩ B| / min(|A|, |B|), or `None` when either set
/// is empty and the ratio is undefined.
fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return None;
    }
    let shared = a.intersection(b).count();
    Some(shared as f64 / smaller as f64)
}

/// Overlap between a live signature and the token union stored in a history
/// record, normalized by the smaller side. Empty sides never match.
pub fn signature_overlap(signature: &ContentSignature, stored_tokens: &[String]) -> f64 {
    let candidate: BTreeSet<&String> = signature
        .title_tokens
        .iter()
        .chain(signature.body_tokens.iter())
        .collect();
    let smaller = candidate.len().min(stored_tokens.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = stored_tokens
        .iter()
        .filter(|token| candidate.contains(token))
        .count();
    shared as f64 / smaller as f64
}
