//! JSON archive output.
//!
//! Serializes the full [`Digest`] structure, category sections and all, so
//! downstream consumers get the machine-readable form of what the rendered
//! digest showed.

use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::Digest;
use crate::outputs::date_dir;

/// Write a digest to `{archive_dir}/{date}/{edition}.json`.
///
/// Creates the date directory as needed and returns the written path.
#[instrument(level = "info", skip_all, fields(archive_dir = %archive_dir))]
pub async fn write_digest_json(digest: &Digest, archive_dir: &str) -> Result<String> {
    let json = serde_json::to_string_pretty(digest)?;

    let dir = format!("{}/{}", archive_dir, date_dir(digest.generated_at));
    fs::create_dir_all(&dir).await?;

    let path = format!("{}/{}.json", dir, digest.edition);
    fs::write(&path, json).await?;
    info!(path = %path, "Wrote digest JSON");

    Ok(path)
}
