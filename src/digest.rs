//! Digest synthesis and deterministic rendering.
//!
//! [`synthesize`] turns the cycle's classified survivors into an ordered
//! [`Digest`]: relevant stories grouped by category, categories ordered by
//! descending story count with alphabetical tie-breaks, and stories within
//! a category ordered most-official-first, most-recent-first (priority tier
//! ascending, publication time descending).
//!
//! [`render`] is a pure function of the digest value. Rendering the same
//! digest twice produces byte-identical text, which is what makes the
//! idempotence guarantee of the whole pipeline observable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{ClassifiedArticle, Digest, DigestSection};
use crate::utils::upcase;

/// Group and order the relevant survivors into a digest.
pub fn synthesize(
    articles: Vec<ClassifiedArticle>,
    generated_at: DateTime<Utc>,
    edition: &str,
) -> Digest {
    let mut by_category: BTreeMap<String, Vec<ClassifiedArticle>> = BTreeMap::new();
    for article in articles.into_iter().filter(|article| article.relevant) {
        let Some(category) = article.category.clone() else {
            continue;
        };
        by_category.entry(category).or_default().push(article);
    }

    for items in by_category.values_mut() {
        items.sort_by(|a, b| {
            a.canonical
                .raw
                .source_priority_tier
                .cmp(&b.canonical.raw.source_priority_tier)
                .then_with(|| b.canonical.raw.published_at.cmp(&a.canonical.raw.published_at))
        });
    }

    // BTreeMap iteration is alphabetical; the stable sort by descending
    // count keeps that order within equal counts
    let mut sections: Vec<DigestSection> = by_category
        .into_iter()
        .map(|(category, items)| DigestSection { category, items })
        .collect();
    sections.sort_by(|a, b| b.items.len().cmp(&a.items.len()));

    Digest {
        generated_at,
        edition: edition.to_string(),
        sections,
    }
}

/// Render a digest to its canonical Markdown text.
///
/// An empty digest is a valid output and renders an explicit notice rather
/// than nothing, so a delivered empty digest is distinguishable from a
/// failed cycle.
pub fn render(digest: &Digest) -> String {
    let mut out = String::new();
    out.push_str("# Current Affairs Digest\n\n");
    out.push_str(&format!(
        "{} Edition — {}\n",
        upcase(&digest.edition),
        digest.generated_at.format("%A, %d %B %Y")
    ));

    if digest.sections.is_empty() {
        out.push_str("\nNo new relevant updates this cycle.\n");
        return out;
    }

    for section in &digest.sections {
        out.push_str(&format!("\n## {}\n\n", section.category));
        for item in &section.items {
            out.push_str(&format!(
                "- **{}** ([{}]({}))\n",
                item.canonical.raw.title, item.canonical.raw.source_id, item.canonical.raw.url
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawArticle;
    use crate::normalize::normalize;
    use chrono::TimeZone;

    fn classified(
        tier: u8,
        hour: u32,
        title: &str,
        category: Option<&str>,
    ) -> ClassifiedArticle {
        ClassifiedArticle {
            canonical: normalize(RawArticle {
                source_id: format!("source-{tier}"),
                source_priority_tier: tier,
                title: title.to_string(),
                body_snippet: String::new(),
                url: format!("https://example.com/{hour}/{}", title.len()),
                published_at: Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap(),
            }),
            relevant: category.is_some(),
            category: category.map(str::to_string),
        }
    }

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_categories_ordered_by_count_then_name() {
        let digest = synthesize(
            vec![
                classified(1, 9, "Repo rate held", Some("Economy & Banking")),
                classified(1, 9, "New bill tabled", Some("Polity & Governance")),
                classified(1, 10, "Bank merger cleared", Some("Economy & Banking")),
                classified(1, 9, "Border talks resume", Some("Defence & Security")),
                classified(1, 10, "Joint exercise announced", Some("Defence & Security")),
            ],
            stamp(),
            "morning",
        );
        let order: Vec<_> = digest
            .sections
            .iter()
            .map(|section| section.category.as_str())
            .collect();
        assert_eq!(
            order,
            vec!["Defence & Security", "Economy & Banking", "Polity & Governance"]
        );
    }

    #[test]
    fn test_items_ordered_by_tier_then_recency() {
        let digest = synthesize(
            vec![
                classified(1, 9, "Newspaper account", Some("Polity & Governance")),
                classified(0, 8, "Official morning bulletin", Some("Polity & Governance")),
                classified(0, 10, "Official follow-up", Some("Polity & Governance")),
            ],
            stamp(),
            "morning",
        );
        let titles: Vec<_> = digest.sections[0]
            .items
            .iter()
            .map(|item| item.canonical.raw.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec!["Official follow-up", "Official morning bulletin", "Newspaper account"]
        );
    }

    #[test]
    fn test_irrelevant_articles_never_rendered() {
        let digest = synthesize(
            vec![
                classified(0, 9, "Cabinet approves scheme", Some("Polity & Governance")),
                classified(1, 10, "Star batter injured", None),
            ],
            stamp(),
            "morning",
        );
        let text = render(&digest);
        assert!(text.contains("Cabinet approves scheme"));
        assert!(!text.contains("Star batter injured"));
    }

    #[test]
    fn test_render_contains_title_source_and_link() {
        let digest = synthesize(
            vec![classified(0, 9, "Cabinet approves scheme", Some("Polity & Governance"))],
            stamp(),
            "evening",
        );
        let text = render(&digest);
        assert!(text.contains("## Polity & Governance"));
        assert!(text.contains("**Cabinet approves scheme**"));
        assert!(text.contains("source-0"));
        assert!(text.contains("https://example.com/9/"));
        assert!(text.contains("Evening Edition"));
        assert!(text.contains("Sunday, 01 June 2025"));
    }

    #[test]
    fn test_repeated_synthesis_is_byte_identical() {
        let input = vec![
            classified(1, 9, "Repo rate held", Some("Economy & Banking")),
            classified(0, 8, "Cabinet approves scheme", Some("Polity & Governance")),
            classified(2, 11, "Trade pact signed", Some("International Relations")),
        ];
        let first = render(&synthesize(input.clone(), stamp(), "morning"));
        let second = render(&synthesize(input, stamp(), "morning"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_digest_is_valid_output() {
        let digest = synthesize(Vec::new(), stamp(), "morning");
        let text = render(&digest);
        assert!(digest.sections.is_empty());
        assert!(text.contains("No new relevant updates this cycle."));
        assert!(text.contains("# Current Affairs Digest"));
    }
}
