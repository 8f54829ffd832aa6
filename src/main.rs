//! # Samachar
//!
//! A current-affairs pipeline that pulls articles from official feeds and
//! the press, collapses duplicate coverage of the same story, drops what
//! has already been reported in earlier cycles, filters the remainder
//! against a fixed theme list, and delivers a categorized digest.
//!
//! ## Features
//!
//! - Curated RSS/Atom feeds plus Google News search queries, fetched
//!   concurrently with per-source failure isolation
//! - Near-duplicate clustering with priority-based canonical selection
//!   (official sources outrank wire copy of the same story)
//! - Cross-cycle suppression backed by a JSON history store
//! - Relevance classification through an OpenAI-compatible API with
//!   bounded retries and conservative fallback
//! - Markdown digest delivered to stdout or Telegram and archived as
//!   Markdown plus JSON with a running index
//!
//! ## Usage
//!
//! ```sh
//! samachar --config samachar.yaml --deliver telegram
//! ```
//!
//! ## Architecture
//!
//! One invocation is one cycle:
//! 1. **Collect**: fetch every configured source into a single batch
//! 2. **Normalize and cluster**: canonical text forms, then single-linkage
//!    grouping by content similarity
//! 3. **History gate**: record survivors, suppress repeats
//! 4. **Classify**: relevance and theme per canonical article
//! 5. **Digest**: synthesize, render, archive, deliver

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod cluster;
mod config;
mod delivery;
mod digest;
mod error;
mod history;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod similarity;
mod sources;
mod utils;

use classify::{ChatClassifier, RetryClassify};
use cli::{Cli, DeliveryMode};
use config::Config;
use delivery::{DeliveryChannel, TelegramSender};
use history::{JsonFileHistory, MemoryHistory};
use outputs::{indexes, json, markdown};
use pipeline::run_cycle;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("samachar starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.archive_dir, ?args.deliver, args.dry_run, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(history_path) = args.history.clone() {
        config.history_path = history_path;
    }
    info!(
        feeds = config.feeds.len(),
        queries = config.google_queries.len(),
        threshold = config.similarity_threshold,
        "Configuration loaded"
    );

    // Early check: ensure the archive dir is writable
    if let Err(e) = ensure_writable_dir(&args.archive_dir).await {
        error!(
            path = %args.archive_dir,
            error = %e,
            "Archive directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // Fail on missing secrets before any network traffic happens.
    let channel = match args.deliver {
        DeliveryMode::Console => DeliveryChannel::Console,
        DeliveryMode::Telegram => {
            let token = args.telegram_token.clone().ok_or_else(|| {
                error::Error::Config(
                    "Telegram delivery needs a bot token (TELEGRAM_BOT_TOKEN)".to_string(),
                )
            })?;
            let chat_id = args.telegram_chat_id.clone().ok_or_else(|| {
                error::Error::Config(
                    "Telegram delivery needs a chat id (TELEGRAM_CHAT_ID)".to_string(),
                )
            })?;
            DeliveryChannel::Telegram(TelegramSender::new(token, chat_id)?)
        }
    };

    let api_key = args.classifier_api_key.clone().ok_or_else(|| {
        error::Error::Config(
            "the relevance classifier needs an API key (CLASSIFIER_API_KEY)".to_string(),
        )
    })?;
    let classifier = RetryClassify::new(
        ChatClassifier::new(&config.classifier, api_key)?,
        config.classifier.max_retries,
        Duration::from_millis(config.classifier.base_delay_ms),
    );

    // ---- Collect articles ----
    let now = Utc::now();
    let batch = sources::collect_articles(&config, now).await?;

    // ---- Run the cycle ----
    let history_path = PathBuf::from(&config.history_path);
    let report = if args.dry_run {
        // Read the real history so suppression behaves normally, but keep
        // every write in memory.
        let file_store = JsonFileHistory::open(history_path, config.recent_history_window).await?;
        let mut store =
            MemoryHistory::preload(file_store.records().to_vec(), config.recent_history_window);
        run_cycle(batch, &config, &classifier, &mut store, now).await?
    } else {
        let mut store = JsonFileHistory::open(history_path, config.recent_history_window).await?;
        run_cycle(batch, &config, &classifier, &mut store, now).await?
    };

    if args.dry_run {
        info!("Dry run: archive and delivery skipped");
        println!("{}", report.rendered);
    } else {
        // ---- Archive ----
        // Archive failures are logged and do not stop delivery.
        match markdown::write_digest_markdown(&report.digest, &report.rendered, &args.archive_dir)
            .await
        {
            Ok(relative) => {
                if let Err(e) =
                    indexes::update_archive_index(&args.archive_dir, &report.digest, &relative)
                        .await
                {
                    error!(error = %e, "Failed to update archive index");
                }
            }
            Err(e) => error!(error = %e, "Failed to write digest Markdown"),
        }
        if let Err(e) = json::write_digest_json(&report.digest, &args.archive_dir).await {
            error!(error = %e, "Failed to write digest JSON");
        }

        // ---- Deliver ----
        channel.deliver(&report.rendered).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        fetched = report.fetched,
        clusters = report.clusters,
        fresh = report.fresh,
        relevant = report.relevant,
        edition = %report.digest.edition,
        "Cycle complete"
    );

    Ok(())
}
