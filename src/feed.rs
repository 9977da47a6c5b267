//! Feed file reading.
//!
//! A feed is delimited text whose first line names the columns. Reading
//! resolves that header into a [`FeedSchema`] and wraps every data line in
//! a [`RawRow`] tagged with its 1-based file line number; all field
//! splitting and validation happens later, in the parse stage.

use anyhow::{Context as _, Result};
use skuforge_core::config::FeedConfig;
use skuforge_core::feed::{FeedSchema, RawRow};
use std::path::Path;
use tracing::info;

/// Read a feed file into its schema and raw rows.
pub async fn read_feed(path: &Path, config: &FeedConfig) -> Result<(FeedSchema, Vec<RawRow>)> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read feed file: {path:?}"))?;
    let (schema, rows) = parse_feed(&content, config)?;
    info!(path = %path.display(), rows = rows.len(), "feed read");
    Ok((schema, rows))
}

/// Split feed text into a schema (from the header line) and raw rows.
///
/// Blank lines are skipped but keep their place in the numbering; an
/// optional `row_limit` caps how many data rows are returned.
pub fn parse_feed(content: &str, config: &FeedConfig) -> Result<(FeedSchema, Vec<RawRow>)> {
    let mut lines = content.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) if !line.trim().is_empty() => line,
        _ => anyhow::bail!("feed has no header line"),
    };
    let schema = FeedSchema::from_header(header, config.delimiter)?;

    let mut rows = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        rows.push(RawRow::new(idx + 1, line));
        if let Some(limit) = config.row_limit {
            if rows.len() >= limit {
                info!(limit, "row limit reached, ignoring the rest of the feed");
                break;
            }
        }
    }
    Ok((schema, rows))
}
