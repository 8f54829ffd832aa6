//! Markdown archive output.
//!
//! Persists the exact rendered digest text. The bytes written here are the
//! same bytes delivered to the configured channel; rendering happens once,
//! upstream, so the archive never drifts from what subscribers saw.

use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::Digest;
use crate::outputs::date_dir;

/// Write the rendered digest to `{archive_dir}/{date}/{edition}.md`.
///
/// Returns the path relative to `archive_dir`, ready for index linking.
#[instrument(level = "info", skip_all, fields(archive_dir = %archive_dir))]
pub async fn write_digest_markdown(
    digest: &Digest,
    rendered: &str,
    archive_dir: &str,
) -> Result<String> {
    let date = date_dir(digest.generated_at);
    let dir = format!("{archive_dir}/{date}");
    fs::create_dir_all(&dir).await?;

    let relative = format!("{}/{}.md", date, digest.edition);
    let path = format!("{archive_dir}/{relative}");
    fs::write(&path, rendered).await?;
    info!(path = %path, "Wrote digest Markdown");

    Ok(relative)
}
