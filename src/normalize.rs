//! Article normalization: the first, purely mechanical pipeline stage.
//!
//! Feed payloads arrive messy: HTML fragments in descriptions, agency
//! credits and publication names glued onto headlines, promo tails appended
//! by feed generators. This module reduces every article to a comparable
//! form:
//!
//! 1. Strip markup and decode entities
//! 2. Lowercase
//! 3. Remove boilerplate (bylines, agency tags, trailing publication names,
//!    promo tails)
//! 4. Fold punctuation to spaces and collapse whitespace
//! 5. Derive the token signature (alphanumeric words, length ≥ 3, minus
//!    stopwords)
//!
//! [`normalize`] is total: malformed input produces empty normalized fields
//! and an empty signature, never an error. Downstream stages treat empty
//! signatures as comparable values like any other.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::models::{ContentSignature, NormalizedArticle, RawArticle};

/// Words too common to carry signal for similarity comparison.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "from", "that", "this", "will", "has", "have", "had", "was",
        "were", "are", "been", "being", "its", "his", "her", "their", "they", "them", "who",
        "whom", "what", "when", "where", "which", "while", "also", "but", "not", "out", "off",
        "about", "after", "before", "over", "under", "into", "onto", "more", "than", "amid",
        "among", "between", "during", "against", "says", "said", "can", "could", "would",
        "should", "may", "might", "must", "all", "any", "some", "such", "per", "via", "how",
        "why", "you", "your", "our", "new",
    ]
    .into_iter()
    .collect()
});

/// Boilerplate removal patterns, applied in order to lowercased text.
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Leading reporter bylines: "by jane doe | ", "by our correspondent:"
        r"^by [a-z][a-z .'-]{2,40}[|:·–—-]\s*",
        // Wire agency credits: "(pti)", "ani |", "- reuters"
        r"[(\[]?\b(?:pti|ani|ians|afp|reuters|xinhua)\b[)\]]?\s*[|:·–—-]?\s*",
        // Trailing publication names on aggregated headlines
        r"\s*[-|–—]\s*(?:the hindu|the indian express|indian express|livemint|mint|the economic times|economic times|the times of india|times of india|dd news|news on air|press information bureau|pib)\s*$",
        // Promo tails
        r"\b(?:read more|continue reading|click here)\b.*$",
        // Feed-generator tails
        r"\bthe post .{0,160} appeared first on .*$",
        r"\(with inputs from[^)]*\)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Normalize one article, deriving its comparable fields and signature.
pub fn normalize(raw: RawArticle) -> NormalizedArticle {
    let normalized_title = normalize_text(&raw.title);
    let normalized_body = normalize_text(&raw.body_snippet);
    let content_signature = ContentSignature {
        title_tokens: significant_tokens(&normalized_title),
        body_tokens: significant_tokens(&normalized_body),
    };
    NormalizedArticle {
        raw,
        normalized_title,
        normalized_body,
        content_signature,
    }
}

/// Reduce text to its comparable form: markup-free, lowercase,
/// boilerplate-free, punctuation folded, whitespace collapsed.
///
/// The output is for comparison only and is never rendered to users.
pub fn normalize_text(text: &str) -> String {
    let stripped = strip_markup(text);
    let mut cleaned = stripped.to_lowercase();
    for pattern in BOILERPLATE.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    let folded: String = cleaned
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip markup tags and decode entities from a text fragment.
///
/// RSS descriptions routinely embed HTML. Parsing the fragment and
/// collecting its text nodes handles broken markup without erroring.
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the significant tokens of an already-normalized string.
fn significant_tokens(normalized: &str) -> std::collections::BTreeSet<String> {
    normalized
        .split_whitespace()
        .filter(|word| word.len() >= 3 && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn raw(title: &str, body: &str) -> RawArticle {
        RawArticle {
            source_id: "test".to_string(),
            source_priority_tier: 1,
            title: title.to_string(),
            body_snippet: body.to_string(),
            url: "https://example.com/a".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_strip_markup_removes_tags() {
        let out = strip_markup("<p>Cabinet approves <b>new scheme</b></p>");
        assert_eq!(out.split_whitespace().collect::<Vec<_>>().join(" "),
            "Cabinet approves new scheme");
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        let out = strip_markup("R&amp;D push announced");
        assert!(out.contains("R&D"));
    }

    #[test]
    fn test_strip_markup_passes_plain_text_through() {
        assert_eq!(strip_markup("plain headline"), "plain headline");
    }

    #[test]
    fn test_normalize_text_lowercases_and_collapses() {
        assert_eq!(
            normalize_text("  Cabinet   APPROVES\n\nScheme "),
            "cabinet approves scheme"
        );
    }

    #[test]
    fn test_normalize_text_strips_publication_suffix() {
        assert_eq!(
            normalize_text("Monsoon session begins today - The Hindu"),
            "monsoon session begins today"
        );
    }

    #[test]
    fn test_normalize_text_strips_agency_credit() {
        assert_eq!(
            normalize_text("(PTI) Cabinet clears infrastructure proposal"),
            "cabinet clears infrastructure proposal"
        );
    }

    #[test]
    fn test_normalize_text_strips_promo_tail() {
        let out = normalize_text("Scheme launched in three states. Read more at our website");
        assert_eq!(out, "scheme launched in three states");
    }

    #[test]
    fn test_normalize_text_strips_feed_generator_tail() {
        let out = normalize_text(
            "Parliament passes bill. The post Parliament passes bill appeared first on Example News.",
        );
        assert_eq!(out, "parliament passes bill");
    }

    #[test]
    fn test_normalize_text_folds_punctuation() {
        assert_eq!(
            normalize_text("India-EU trade: talks resume, officials say"),
            "india eu trade talks resume officials say"
        );
    }

    #[test]
    fn test_normalize_is_total_on_garbage() {
        let article = normalize(raw("<<<>>>&&&", "\u{0000}\u{FFFF}"));
        assert!(article.content_signature.is_empty());
    }

    #[test]
    fn test_normalize_empty_input_yields_empty_signature() {
        let article = normalize(raw("", ""));
        assert_eq!(article.normalized_title, "");
        assert_eq!(article.normalized_body, "");
        assert!(article.content_signature.is_empty());
    }

    #[test]
    fn test_signature_ignores_word_order() {
        let a = normalize(raw("Cabinet approves irrigation scheme", ""));
        let b = normalize(raw("Irrigation scheme approves cabinet", ""));
        assert_eq!(a.content_signature, b.content_signature);
    }

    #[test]
    fn test_signature_drops_stopwords_and_short_tokens() {
        let article = normalize(raw("The cabinet has approved it at last", ""));
        let tokens = article.content_signature.sorted_tokens();
        assert_eq!(tokens, vec!["approved", "cabinet", "last"]);
    }

    #[test]
    fn test_signature_keeps_title_and_body_separate() {
        let article = normalize(raw("Cabinet approves scheme", "Farmers welcome decision"));
        assert!(article.content_signature.title_tokens.contains("cabinet"));
        assert!(article.content_signature.body_tokens.contains("farmers"));
        assert!(!article.content_signature.title_tokens.contains("farmers"));
    }
}
