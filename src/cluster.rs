//! Single-linkage clustering of normalized articles.
//!
//! Articles are processed in source-priority order (stable sort by tier, so
//! official sources seed clusters first). Each article is compared against
//! every member of every existing cluster: one match above the threshold is
//! enough to join. An article that matches several clusters at once is a
//! bridge: those clusters are describing the same event and are merged.
//! Transitive merging is accepted behavior: occasionally grouping two
//! distinct-but-related stories costs less than surfacing the same event
//! twice.
//!
//! Clustering is deterministic for a given input and threshold. The
//! canonical member is *not* assumed to be the seed; callers go through
//! [`StoryCluster::canonical`], which re-derives it from the full
//! membership.

use tracing::{debug, info, instrument};

use crate::models::{NormalizedArticle, StoryCluster};
use crate::similarity::similarity;

/// Group a batch of articles into story clusters.
///
/// An article joins a cluster when its similarity to *any* current member
/// strictly exceeds `threshold`; otherwise it starts a singleton.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub fn cluster(mut articles: Vec<NormalizedArticle>, threshold: f64) -> Vec<StoryCluster> {
    articles.sort_by_key(|article| article.raw.source_priority_tier);

    let mut clusters: Vec<StoryCluster> = Vec::new();
    for article in articles {
        let matching: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|(_, cluster)| {
                cluster
                    .members
                    .iter()
                    .any(|member| similarity(member, &article) > threshold)
            })
            .map(|(idx, _)| idx)
            .collect();

        match matching.split_first() {
            None => clusters.push(StoryCluster::new(article)),
            Some((&target, rest)) => {
                if !rest.is_empty() {
                    debug!(
                        bridged = rest.len() + 1,
                        title = %article.raw.title,
                        "Bridging article merged clusters"
                    );
                }
                // Back to front so the remaining indices stay valid
                for &idx in rest.iter().rev() {
                    let merged = clusters.remove(idx);
                    clusters[target].members.extend(merged.members);
                }
                clusters[target].members.push(article);
            }
        }
    }

    info!(clusters = clusters.len(), "Clustering complete");
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawArticle;
    use crate::normalize::normalize;
    use chrono::{TimeZone, Utc};

    fn article(tier: u8, minute: u32, title: &str) -> NormalizedArticle {
        normalize(RawArticle {
            source_id: format!("source-{tier}"),
            source_priority_tier: tier,
            title: title.to_string(),
            body_snippet: String::new(),
            url: format!("https://example.com/{tier}/{minute}"),
            published_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
                + chrono::Duration::minutes(i64::from(minute)),
        })
    }

    #[test]
    fn test_near_duplicates_cluster_together() {
        let clusters = cluster(
            vec![
                article(0, 0, "Cabinet approves Kisan Samman scheme"),
                article(1, 15, "Govt approves Kisan Samman scheme for farmers"),
            ],
            0.6,
        );
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
    }

    #[test]
    fn test_unrelated_articles_stay_separate() {
        let clusters = cluster(
            vec![
                article(0, 0, "Cabinet approves Kisan Samman scheme"),
                article(1, 60, "Local team wins cricket tournament final"),
            ],
            0.6,
        );
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_priority_resolution_is_input_order_independent() {
        let official = "Cabinet approves Kisan Samman scheme";
        let newspaper = "Govt approves Kisan Samman scheme for farmers";

        let forward = cluster(
            vec![article(0, 0, official), article(1, 15, newspaper)],
            0.6,
        );
        let reversed = cluster(
            vec![article(1, 15, newspaper), article(0, 0, official)],
            0.6,
        );

        assert_eq!(forward.len(), 1);
        assert_eq!(reversed.len(), 1);
        assert_eq!(forward[0].canonical().raw.title, official);
        assert_eq!(reversed[0].canonical().raw.title, official);
    }

    #[test]
    fn test_bridging_article_merges_clusters() {
        // The bridge shares enough tokens with each of two otherwise
        // unrelated articles to pull them into one cluster.
        let clusters = cluster(
            vec![
                article(0, 0, "Metro rail phase approved"),
                article(0, 5, "Budget session dates announced"),
                article(1, 30, "Metro rail phase budget session dates"),
            ],
            0.6,
        );
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 3);
    }

    #[test]
    fn test_threshold_is_strict() {
        // Overlap is exactly 2/4 = 0.5: not joined at T=0.5, joined below it
        let a = "Trade deal talks resume";
        let b = "Trade deal signed formally";
        let at_threshold = cluster(vec![article(0, 0, a), article(1, 10, b)], 0.5);
        assert_eq!(at_threshold.len(), 2);
        let below_threshold = cluster(vec![article(0, 0, a), article(1, 10, b)], 0.49);
        assert_eq!(below_threshold.len(), 1);
    }

    #[test]
    fn test_degenerate_articles_share_one_cluster() {
        // Garbage input normalizes to empty signatures, which compare equal
        let clusters = cluster(
            vec![article(1, 0, "<<<>>>"), article(2, 5, "&&&&")],
            0.6,
        );
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn test_empty_batch_yields_no_clusters() {
        let clusters = cluster(Vec::new(), 0.6);
        assert!(clusters.is_empty());
    }
}
