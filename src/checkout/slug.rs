//! Attribution slug discovery
//!
//! When the URL does not reveal the project identifier, the checkout is
//! scanned for a marker line such as `## X-Curse-Project-ID: 12345` and the
//! token following the marker is used.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::{BINARY_SNIFF_LEN, MAX_SCAN_FILE_SIZE};

const VCS_METADATA_DIRS: &[&str] = &[".svn", ".git", ".hg"];

/// Scan `root` for `marker` and return the token that follows it.
///
/// Files are visited in name order and the first match wins. Binary files,
/// files over 1 MiB and VCS metadata directories are skipped. A missing
/// `root` yields `None`.
///
/// # Errors
///
/// Returns an error only if the directory walk itself fails.
pub fn discover_slug(root: &Path, marker: &str) -> Result<Option<String>> {
    if marker.is_empty() || !root.is_dir() {
        return Ok(None);
    }

    let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && entry.file_name().to_str().is_some_and(|name| VCS_METADATA_DIRS.contains(&name)))
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let too_large = entry.metadata().map(|m| m.len() > MAX_SCAN_FILE_SIZE).unwrap_or(true);
        if too_large {
            continue;
        }

        match slug_in_file(entry.path(), marker) {
            Ok(Some(slug)) => {
                tracing::debug!("Found attribution slug '{slug}' in {}", entry.path().display());
                return Ok(Some(slug));
            }
            Ok(None) => {}
            Err(e) => tracing::trace!("Skipping {}: {e}", entry.path().display()),
        }
    }

    Ok(None)
}

/// [`discover_slug`] on the blocking thread pool.
///
/// # Errors
///
/// Returns an error if the walk fails or the blocking task panics.
pub async fn discover_slug_blocking(root: PathBuf, marker: String) -> Result<Option<String>> {
    tokio::task::spawn_blocking(move || discover_slug(&root, &marker))
        .await
        .context("Attribution scan task failed")?
}

fn slug_in_file(path: &Path, marker: &str) -> std::io::Result<Option<String>> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.take(MAX_SCAN_FILE_SIZE).read_to_end(&mut bytes)?;

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Ok(None);
    }

    let text = String::from_utf8_lossy(&bytes);
    Ok(text.find(marker).and_then(|start| {
        text[start + marker.len()..].split_whitespace().next().map(str::to_string)
    }))
}
