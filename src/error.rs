//! Failure taxonomy for the digest pipeline.
//!
//! Errors fall into four behavioral classes:
//!
//! - **Feed** errors are transient and scoped to a single source. The
//!   adapter layer logs them and the cycle proceeds with whatever fetched;
//!   an empty batch is valid input.
//! - **Classifier** errors are scoped to a single article. The relevance
//!   filter retries once, then excludes the article. They never abort a
//!   cycle.
//! - **History** errors are fatal for the cycle. If the store cannot be
//!   read or written, nothing is delivered and the caller retries the
//!   whole cycle later.
//! - Everything else (`Io`, `Json`, `Config`, `Delivery`) surfaces
//!   normally through `?`.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("feed error from {url}: {message}")]
    Feed { url: String, message: String },

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("history store error: {0}")]
    History(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
