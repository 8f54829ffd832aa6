//! Pipeline configuration.
//!
//! Loaded from a YAML file; every key is optional and falls back to the
//! built-in defaults below, so a config file only needs to name what it
//! changes. The defaults carry a complete working setup: the curated feed
//! registry, the Google News query list, the source-priority table, and
//! the classifier's theme and exclusion vocabularies.
//!
//! Secrets (API keys, bot tokens) never live here; they come from the CLI
//! or environment.

use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::history::DEFAULT_RECENT_WINDOW;

/// One curated RSS feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Display name, used as `source_id` when the item carries no publisher.
    pub name: String,
    /// Feed URL.
    pub url: String,
}

/// Settings for the relevance classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of an OpenAI-compatible API, including the version path.
    pub base_url: String,
    /// Model name sent with each request.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry attempts after a failure; kept small so a slow classifier
    /// cannot stall the cycle.
    pub max_retries: usize,
    /// Initial retry backoff in milliseconds.
    pub base_delay_ms: u64,
    /// Theme vocabulary the classifier assigns from.
    pub categories: Vec<String>,
    /// Topics the classifier must reject.
    pub excluded_topics: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            max_retries: 1,
            base_delay_ms: 500,
            categories: default_categories(),
            excluded_topics: default_excluded_topics(),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clustering and fuzzy-history threshold; a similarity strictly above
    /// this joins a cluster.
    pub similarity_threshold: f64,
    /// Cap on articles entering the clustering stage; the lowest-priority
    /// overflow is dropped. Guards the pairwise comparison loop.
    pub max_batch: usize,
    /// How many of the newest history records fuzzy lookup scans.
    pub recent_history_window: usize,
    /// Whether the history gate also fuzzy-matches recent stories.
    pub fuzzy_history: bool,
    /// Concurrent classifier calls per cycle.
    pub classify_concurrency: usize,
    /// Path of the JSON history store.
    pub history_path: String,
    /// Curated RSS feeds.
    pub feeds: Vec<FeedConfig>,
    /// Google News search queries.
    pub google_queries: Vec<String>,
    /// Host suffix to priority tier; lower tiers are more authoritative.
    pub source_tiers: BTreeMap<String, u8>,
    /// Tier for hosts not in the table.
    pub default_tier: u8,
    /// Classifier settings.
    pub classifier: ClassifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            max_batch: 150,
            recent_history_window: DEFAULT_RECENT_WINDOW,
            fuzzy_history: true,
            classify_concurrency: 8,
            history_path: "history.json".to_string(),
            feeds: default_feeds(),
            google_queries: default_google_queries(),
            source_tiers: default_source_tiers(),
            default_tier: 5,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a YAML config file.
    pub fn load(path: &str) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        let config: Config =
            serde_yaml::from_str(&text).map_err(|e| Error::Config(format!("{path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Config> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.similarity_threshold <= 0.0 || self.similarity_threshold > 1.0 {
            return Err(Error::Config(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.max_batch == 0 {
            return Err(Error::Config("max_batch must be at least 1".to_string()));
        }
        if self.classify_concurrency == 0 {
            return Err(Error::Config(
                "classify_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Priority tier for an article URL: exact host match or dot-suffix
    /// match against the tier table, `default_tier` otherwise (including
    /// unparseable URLs).
    pub fn tier_for_url(&self, url: &str) -> u8 {
        let Ok(parsed) = Url::parse(url) else {
            return self.default_tier;
        };
        let Some(host) = parsed.host_str() else {
            return self.default_tier;
        };
        let host = host.strip_prefix("www.").unwrap_or(host);
        for (domain, tier) in &self.source_tiers {
            if host == domain || host.ends_with(&format!(".{domain}")) {
                return *tier;
            }
        }
        self.default_tier
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    [
        (
            "Press Information Bureau",
            "https://pib.gov.in/newsite/rss_english.aspx",
        ),
        ("DD News", "https://ddnews.gov.in/rss-feeds/national"),
        (
            "The Hindu",
            "https://www.thehindu.com/news/national/feeder/default.rss",
        ),
        (
            "The Indian Express",
            "https://indianexpress.com/section/india/feed/",
        ),
        ("Mint", "https://www.livemint.com/rss/news"),
        (
            "The Economic Times",
            "https://economictimes.indiatimes.com/news/economy/rssfeeds/12416805.cms",
        ),
        (
            "The Times of India",
            "https://timesofindia.indiatimes.com/rssfeedstopstories.cms",
        ),
    ]
    .into_iter()
    .map(|(name, url)| FeedConfig {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

fn default_google_queries() -> Vec<String> {
    [
        "site:imf.org",
        "site:worldbank.org",
        "site:who.int",
        "site:mea.gov.in",
        "site:mof.gov.in",
        "site:mha.gov.in",
        "site:moef.gov.in",
        "site:isro.gov.in",
        "site:rbi.org.in",
        "site:sebi.gov.in",
        "site:niti.gov.in",
        "Supreme Court of India verdict",
        "Govt of India Scheme",
        "Constitutional Amendment",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_source_tiers() -> BTreeMap<String, u8> {
    [
        ("pib.gov.in", 0),
        ("ddnews.gov.in", 0),
        ("newsonair.gov.in", 0),
        ("mea.gov.in", 0),
        ("rbi.org.in", 0),
        ("sebi.gov.in", 0),
        ("isro.gov.in", 0),
        ("niti.gov.in", 0),
        ("imf.org", 0),
        ("worldbank.org", 0),
        ("who.int", 0),
        ("thehindu.com", 1),
        ("indianexpress.com", 1),
        ("livemint.com", 2),
        ("economictimes.indiatimes.com", 2),
        ("timesofindia.indiatimes.com", 3),
        ("news.google.com", 4),
    ]
    .into_iter()
    .map(|(domain, tier)| (domain.to_string(), tier))
    .collect()
}

fn default_categories() -> Vec<String> {
    [
        "Polity & Governance",
        "Economy & Banking",
        "International Relations",
        "Science & Technology",
        "Environment",
        "Defence & Security",
        "Society & Education",
        "Legal & Constitutional",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_excluded_topics() -> Vec<String> {
    [
        "local crime",
        "political gossip and opinion pieces",
        "sports results",
        "entertainment and celebrity news",
        "trivial accidents",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feeds.len(), 7);
        assert_eq!(config.classifier.categories.len(), 8);
        assert!(!config.google_queries.is_empty());
    }

    #[test]
    fn test_partial_yaml_overrides_only_named_keys() {
        let config: Config = serde_yaml::from_str("similarity_threshold: 0.75").unwrap();
        assert_eq!(config.similarity_threshold, 0.75);
        assert_eq!(config.max_batch, 150);
        assert_eq!(config.feeds.len(), 7);
        assert!(config.fuzzy_history);
    }

    #[test]
    fn test_nested_classifier_override_keeps_other_defaults() {
        let yaml = "classifier:\n  model: llama3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.classifier.model, "llama3");
        assert_eq!(config.classifier.base_url, "https://api.openai.com/v1");
        assert_eq!(config.classifier.max_retries, 1);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut config = Config::default();
        config.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
        config.similarity_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.classify_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tier_for_url_matches_host_and_subdomains() {
        let config = Config::default();
        assert_eq!(config.tier_for_url("https://pib.gov.in/PressRelease.aspx?id=1"), 0);
        assert_eq!(config.tier_for_url("https://www.thehindu.com/news/national/a"), 1);
        assert_eq!(
            config.tier_for_url("https://m.timesofindia.indiatimes.com/articleshow/1.cms"),
            3
        );
        assert_eq!(config.tier_for_url("https://news.google.com/rss/articles/x"), 4);
    }

    #[test]
    fn test_tier_for_url_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(config.tier_for_url("https://random-blog.example.org/post"), 5);
        assert_eq!(config.tier_for_url("not a url at all"), 5);
    }
}
