//! Local Alert Archive
//!
//! Every alert a poller fetches is appended to a local log before any
//! delivery attempt, so a lost email still leaves a trace on disk.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::types::OutboxEntry;

const DIVIDER: &str = "----------------------------------------------------------------";

/// Append one alert to the archive log at `path`, creating parent
/// directories as needed.
pub fn archive_locally(path: &str, alert: &OutboxEntry) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create archive directory: {}", parent.display())
            })?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open archive: {path}"))?;

    write!(
        file,
        "{DIVIDER}\nTIME:    {}\nSUBJECT: {}\nMESSAGE:\n{}\n{DIVIDER}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        alert.subject,
        alert.body.trim(),
    )
    .context("failed to write to archive")?;

    Ok(())
}

/// Return the last `n` archived blocks, oldest first. A missing log
/// just means nothing has been processed yet.
pub fn tail(path: &str, n: usize) -> Result<Vec<String>> {
    if !Path::new(path).exists() {
        return Ok(Vec::new());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read archive: {path}"))?;

    let separator = format!("{DIVIDER}\n\n");
    let blocks: Vec<String> = content
        .split(&separator)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(String::from)
        .collect();

    let start = blocks.len().saturating_sub(n);
    Ok(blocks[start..].to_vec())
}
