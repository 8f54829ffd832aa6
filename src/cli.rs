//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via flags or environment variables; everything
//! else about a run lives in the YAML config file.

use clap::{Parser, ValueEnum};

/// Delivery channel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryMode {
    /// Print the rendered digest to stdout.
    Console,
    /// Send the rendered digest to a Telegram chat.
    Telegram,
}

/// Command-line arguments for the digest pipeline.
///
/// # Examples
///
/// ```sh
/// # One cycle with the built-in defaults, digest on stdout
/// samachar
///
/// # Custom config and archive location
/// samachar --config samachar.yaml --archive-dir ./digests
///
/// # Deliver to Telegram
/// samachar --deliver telegram
///
/// # Rehearse without touching the history store or delivering
/// samachar --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the history store path from the config
    #[arg(long)]
    pub history: Option<String>,

    /// Directory the digest archive is written under
    #[arg(short, long, default_value = "digests")]
    pub archive_dir: String,

    /// Where the rendered digest goes
    #[arg(long, value_enum, default_value_t = DeliveryMode::Console)]
    pub deliver: DeliveryMode,

    /// API key for the relevance classifier
    #[arg(long, env = "CLASSIFIER_API_KEY")]
    pub classifier_api_key: Option<String>,

    /// Telegram bot token (required with `--deliver telegram`)
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_token: Option<String>,

    /// Telegram chat id (required with `--deliver telegram`)
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Run the full pipeline but record nothing and deliver nothing
    #[arg(long)]
    pub dry_run: bool,
}
