//! Digest archive writers.
//!
//! Every cycle leaves a permanent record on disk next to whatever channel
//! the digest was delivered on. Files are organized by date, one
//! subdirectory per day, one file pair per edition:
//!
//! ```text
//! archive_dir/
//! ├── index.md              # reverse-chronological archive index
//! ├── 2025-06-01/
//! │   ├── morning.md
//! │   ├── morning.json
//! │   └── evening.md
//! ```
//!
//! The date in every path comes from the digest's own `generated_at`
//! timestamp, so re-running a cycle overwrites that edition's files
//! instead of scattering duplicates.

pub mod indexes;
pub mod json;
pub mod markdown;

use chrono::{DateTime, Utc};

/// Date directory name for a digest timestamp.
pub(crate) fn date_dir(generated_at: DateTime<Utc>) -> String {
    generated_at.format("%Y-%m-%d").to_string()
}
