//! VM and host list files
//!
//! One entry per line. Surrounding whitespace is trimmed; blank lines and
//! lines starting with `#` are dropped. Order and duplicates are kept.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{HostshiftError, HostshiftResult};

/// Extract entries from list file content
pub fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a list file, failing if it is missing or has no entries
pub async fn load_entries(path: &Path) -> HostshiftResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => HostshiftError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => HostshiftError::InputRead {
                path: path.to_path_buf(),
                source,
            },
        })?;

    let entries = parse_entries(&content);
    if entries.is_empty() {
        return Err(HostshiftError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}
