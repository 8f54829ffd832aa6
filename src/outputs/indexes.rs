//! Archive index maintenance.
//!
//! Keeps `{archive_dir}/index.md` pointing at every digest ever written.
//! Dates appear newest-first; editions nest under their date in the order
//! they were produced. Updates are idempotent, so re-running an edition
//! never duplicates its entry.

use std::path::Path;

use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::Digest;
use crate::outputs::date_dir;
use crate::utils::upcase;

const INDEX_HEADER: &str = "# Digest Archive";

/// Add one edition to the archive index, creating the file if missing.
///
/// `markdown_relative` is the edition path relative to `archive_dir`, as
/// returned by the Markdown writer.
#[instrument(level = "info", skip_all, fields(archive_dir = %archive_dir, file = %markdown_relative))]
pub async fn update_archive_index(
    archive_dir: &str,
    digest: &Digest,
    markdown_relative: &str,
) -> Result<()> {
    let index_path = format!("{archive_dir}/index.md");
    let mut content = String::new();

    if Path::new(&index_path).exists() {
        content = fs::read_to_string(&index_path).await?;
    } else {
        content.push_str(INDEX_HEADER);
        content.push_str("\n\n");
    }

    let date_heading = format!("- **{}**", date_dir(digest.generated_at));
    let edition_entry = format!(
        "    - [{}](./{})",
        upcase(&digest.edition),
        markdown_relative
    );

    let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
    let lines = insert_edition_entry(lines, &date_heading, &edition_entry);

    fs::write(&index_path, lines.join("\n")).await?;
    info!(path = %index_path, "Updated archive index");
    Ok(())
}

/// Insert an edition entry under its date heading.
///
/// An existing date gains the edition at the end of its block; an unseen
/// date starts a new block directly under the header, which keeps the
/// index newest-first. An entry already present is left alone.
fn insert_edition_entry(
    mut lines: Vec<String>,
    date_heading: &str,
    edition_entry: &str,
) -> Vec<String> {
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim() == date_heading.trim() {
            let mut j = i + 1;
            while j < lines.len() && lines[j].starts_with("    - ") {
                if lines[j].trim() == edition_entry.trim() {
                    return lines;
                }
                j += 1;
            }
            lines.insert(j, edition_entry.to_string());
            return lines;
        }
        i += 1;
    }

    if let Some(pos) = lines.iter().position(|l| l.starts_with(INDEX_HEADER)) {
        let insert_at = pos + 1;
        lines.insert(insert_at, String::new());
        lines.insert(insert_at + 1, date_heading.to_string());
        lines.insert(insert_at + 2, edition_entry.to_string());
    } else {
        lines.push(date_heading.to_string());
        lines.push(edition_entry.to_string());
    }
    lines
}
