//! Task merger: deterministic combination of fetched sources
//!
//! Contents are concatenated in source-declaration order, deduplicated with
//! set semantics and sorted lexicographically, which makes staged output
//! byte-reproducible regardless of download completion order.

use crate::error::{Error, Result};
use crate::fetch::FetchResult;
use std::collections::BTreeSet;
use std::path::Path;

/// Merge fetched contents for one task into its final staged body
///
/// Results are ordered by source index before concatenation; blank contents
/// (soft-failed or genuinely empty sources) are skipped. For the `yaml`
/// format the first line is preserved verbatim as a header and only the
/// remaining lines are deduplicated and sorted. Returns
/// [`Error::EmptyContent`] when nothing non-blank remains.
pub fn merge_contents(task_name: &str, mut results: Vec<FetchResult>, format: &str) -> Result<String> {
    results.sort_by_key(|r| r.index);

    let combined: String = results
        .iter()
        .filter(|r| !r.content.trim().is_empty())
        .map(|r| r.content.as_str())
        .collect();

    if combined.trim().is_empty() {
        return Err(Error::EmptyContent(task_name.to_string()));
    }

    let mut lines = combined.lines();

    let body = if format == "yaml" {
        // First line is a directive (e.g. "payload:") and must survive
        // untouched; dedup/sort applies to the rest only.
        let header = lines.next().unwrap_or_default();
        let unique: BTreeSet<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
        let mut out = String::from(header);
        for line in unique {
            out.push('\n');
            out.push_str(line);
        }
        out
    } else {
        let unique: BTreeSet<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
        unique.into_iter().collect::<Vec<_>>().join("\n")
    };

    Ok(body)
}

/// Write `body` to `path` atomically
///
/// Content goes to a `.tmp` sibling first and is renamed into place, so
/// readers never observe a partially written staged file. On any failure the
/// temporary file is removed and the error propagates.
pub async fn write_atomic(path: &Path, body: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    let result = async {
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}
