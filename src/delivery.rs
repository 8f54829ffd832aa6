//! Digest delivery channels.
//!
//! The rendered digest either goes to stdout or to a Telegram chat. The
//! Telegram path sends plain text on purpose: headlines routinely carry
//! characters that Telegram's Markdown entity parser rejects with a 400,
//! and a delivery that fails after the history gate has recorded the
//! cycle would silently swallow stories. Long digests are split on
//! paragraph boundaries to stay under the message length limit.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};

/// Telegram caps messages at 4096 characters; stay under it with room to
/// spare.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

const SEND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Sends digest text to one Telegram chat via the Bot API.
pub struct TelegramSender {
    client: Client,
    token: String,
    chat_id: String,
}

impl fmt::Debug for TelegramSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSender")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramSender {
    pub fn new(token: String, chat_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Delivery(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token,
            chat_id,
        })
    }

    /// Send `text`, split into as many messages as the length limit needs.
    #[instrument(level = "info", skip_all)]
    pub async fn send(&self, text: &str) -> Result<()> {
        let chunks = split_message(text, TELEGRAM_MESSAGE_LIMIT);
        let total = chunks.len();
        for (idx, chunk) in chunks.iter().enumerate() {
            self.send_chunk(chunk).await?;
            debug!(chunk = idx + 1, total, "Sent digest chunk");
        }
        info!(chunks = total, "Digest delivered to Telegram");
        Ok(())
    }

    async fn send_chunk(&self, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Delivery(format!(
                "sendMessage returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// Where a finished digest goes.
#[derive(Debug)]
pub enum DeliveryChannel {
    /// Print to stdout.
    Console,
    /// Send to a Telegram chat.
    Telegram(TelegramSender),
}

impl DeliveryChannel {
    pub async fn deliver(&self, rendered: &str) -> Result<()> {
        match self {
            DeliveryChannel::Console => {
                println!("{rendered}");
                Ok(())
            }
            DeliveryChannel::Telegram(sender) => sender.send(rendered).await,
        }
    }
}

/// Split `message` into chunks of at most `max_len` characters, preferring
/// paragraph breaks, then line breaks, then spaces. A single run longer
/// than the limit is cut at a character boundary.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut remaining = message.trim();

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }
        let window_end = remaining
            .char_indices()
            .nth(max_len)
            .map(|(idx, _)| idx)
            .unwrap_or(remaining.len());
        let window = &remaining[..window_end];
        let split_pos = window
            .rfind("\n\n")
            .or_else(|| window.rfind('\n'))
            .or_else(|| window.rfind(' '))
            .filter(|&pos| pos > 0)
            .unwrap_or(window_end);
        chunks.push(remaining[..split_pos].trim_end().to_string());
        remaining = remaining[split_pos..].trim_start();
    }

    chunks
}
