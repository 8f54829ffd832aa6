//! Relevance classification with exponential backoff retry logic.
//!
//! Each cluster's canonical article is shown to an OpenAI-compatible chat
//! model acting as a strict relevance filter: civic, administrative,
//! economic, and international stories pass with a category from the
//! configured theme list; crime, sports results, and entertainment gossip
//! are rejected.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`ClassifyAsync`]: Core trait defining async classification
//! - [`ChatClassifier`]: HTTP client for chat-completions endpoints
//! - [`RetryClassify`]: Decorator that adds retry logic to any
//!   `ClassifyAsync` implementation
//! - [`classify_all`]: Bounded-concurrency fan-out over a cluster batch
//!
//! # Failure Policy
//!
//! A classification failure never aborts a cycle. After the decorator's
//! retries are spent, [`classify_all`] marks the article irrelevant and
//! moves on; a conservative exclusion beats both a crashed digest and an
//! unvetted story.

use std::fmt;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rand::{rng, Rng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::models::{ClassifiedArticle, StoryCluster};
use crate::utils::truncate_for_log;

/// A relevance judgment for one article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    /// Whether the story belongs in the digest.
    pub relevant: bool,
    /// Assigned theme; required when relevant, absent otherwise.
    #[serde(default)]
    pub category: Option<String>,
}

/// Trait for async relevance classification.
///
/// Implementors judge one article from its headline and body snippet.
/// The abstraction exists so the pipeline can run against scripted fakes
/// in tests and so [`RetryClassify`] can wrap any backend.
pub trait ClassifyAsync {
    /// Classify one article.
    ///
    /// # Arguments
    ///
    /// * `title` - The headline as published (not normalized)
    /// * `body` - The body snippet as published
    async fn classify(&self, title: &str, body: &str) -> Result<Verdict>;
}

/// Wrapper that adds exponential backoff retry logic to any
/// [`ClassifyAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryClassify<T> {
    /// The underlying classifier to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl<T> RetryClassify<T>
where
    T: ClassifyAsync,
{
    /// Create a new retry wrapper around an existing classifier.
    ///
    /// The per-article budget is kept small (one retry by default)
    /// because a slow classifier stalls the whole digest cycle.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryClassify<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClassify")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> ClassifyAsync for RetryClassify<T>
where
    T: ClassifyAsync + fmt::Debug,
{
    #[instrument(level = "info", skip_all)]
    async fn classify(&self, title: &str, body: &str) -> Result<Verdict> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.classify(title, body).await {
                Ok(verdict) => {
                    return Ok(verdict);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "classify() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(31));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "classify() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Build the system instruction from the configured theme and exclusion
/// lists.
pub fn build_system_prompt(categories: &[String], excluded_topics: &[String]) -> String {
    format!(
        "You are a strict relevance filter for an Indian current-affairs digest read by \
         civil-services aspirants.\n\
         Relevant stories cover: government policies and schemes, the economy and banking, \
         international relations, court verdicts, constitutional and legal developments, \
         major appointments, science and technology, defence, and the environment.\n\
         Not relevant: {}.\n\
         If the story is relevant, assign exactly one category from this list: {}.\n\
         Respond with a single JSON object of the form \
         {{\"relevant\": true, \"category\": \"...\"}} or \
         {{\"relevant\": false, \"category\": null}}. \
         No markdown, no code fences, no explanation.",
        excluded_topics.join("; "),
        categories.join(", "),
    )
}

/// Classifier backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    system_prompt: String,
}

impl ChatClassifier {
    /// Build a classifier from configuration and an API key.
    pub fn new(config: &ClassifierConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Classifier(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            system_prompt: build_system_prompt(&config.categories, &config.excluded_topics),
        })
    }
}

impl fmt::Debug for ChatClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClassifier")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ClassifyAsync for ChatClassifier {
    #[instrument(level = "info", skip_all)]
    async fn classify(&self, title: &str, body: &str) -> Result<Verdict> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Headline: {title}\nSnippet: {body}"),
                },
            ],
            temperature: 0.0,
            max_tokens: 60,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Classifier(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Classifier(format!(
                "API returned {status}: {}",
                truncate_for_log(&body, 200)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Classifier(format!("malformed response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Classifier("response contained no choices".to_string()))?;

        let verdict = parse_verdict(&content)?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            relevant = verdict.relevant,
            "Verdict received"
        );
        Ok(verdict)
    }
}

/// Parse a model reply into a [`Verdict`].
///
/// Tolerates code-fenced replies. A relevant verdict without a usable
/// category is an error, since the digest cannot place the story; an
/// irrelevant verdict has its category cleared.
pub fn parse_verdict(content: &str) -> Result<Verdict> {
    let cleaned = strip_code_fence(content);
    let verdict: Verdict = serde_json::from_str(cleaned).map_err(|e| {
        Error::Classifier(format!(
            "unparseable verdict {:?}: {e}",
            truncate_for_log(content, 120)
        ))
    })?;

    if verdict.relevant
        && verdict
            .category
            .as_deref()
            .map_or(true, |category| category.trim().is_empty())
    {
        return Err(Error::Classifier(
            "relevant verdict without a category".to_string(),
        ));
    }

    Ok(Verdict {
        relevant: verdict.relevant,
        category: if verdict.relevant {
            verdict.category
        } else {
            None
        },
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

/// Classify every cluster's canonical article, concurrently but bounded.
///
/// Results complete in arbitrary order; they are re-joined to their input
/// position by index before returning, so the output order is exactly the
/// cluster order. Classifier failures become irrelevant verdicts and are
/// logged, never propagated.
#[instrument(level = "info", skip_all, fields(clusters = clusters.len()))]
pub async fn classify_all<C: ClassifyAsync>(
    clusters: &[StoryCluster],
    classifier: &C,
    limit: usize,
) -> Vec<ClassifiedArticle> {
    let mut outcomes: Vec<(usize, ClassifiedArticle)> =
        stream::iter(clusters.iter().enumerate())
            .map(|(idx, cluster)| async move {
                let canonical = cluster.canonical();
                let classified = match classifier
                    .classify(&canonical.raw.title, &canonical.raw.body_snippet)
                    .await
                {
                    Ok(verdict) => ClassifiedArticle {
                        canonical: canonical.clone(),
                        relevant: verdict.relevant,
                        category: verdict.category,
                    },
                    Err(e) => {
                        warn!(
                            title = %canonical.raw.title,
                            error = %e,
                            "Classification failed; excluding article"
                        );
                        ClassifiedArticle {
                            canonical: canonical.clone(),
                            relevant: false,
                            category: None,
                        }
                    }
                };
                (idx, classified)
            })
            .buffer_unordered(limit.max(1))
            .collect()
            .await;

    // Completion order is nondeterministic; restore input order
    outcomes.sort_by_key(|(idx, _)| *idx);

    let relevant = outcomes.iter().filter(|(_, article)| article.relevant).count();
    info!(total = outcomes.len(), relevant, "Classification complete");
    outcomes.into_iter().map(|(_, article)| article).collect()
}
