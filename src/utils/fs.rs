//! File system helpers used by the cache and the package copier.
//!
//! All functions are synchronous; async callers run them through
//! `tokio::task::spawn_blocking` when the tree being touched may be large.

use crate::core::file_error::{FileOperation, FileResultExt};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ensures a directory exists, creating it and all parents if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or if the path exists
/// but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_file_context(
            FileOperation::CreateDir,
            path,
            "creating directory",
            "utils::fs::ensure_dir",
        )?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// Readers either observe the previous content or the new content, never a
/// partial write. Parent directories are created if missing.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written, synced or renamed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Path has no parent directory: {}", path.display()))?;
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Recursively removes a directory; a missing directory is not an error.
///
/// # Errors
///
/// Returns an error if the removal fails due to permissions or other
/// filesystem errors.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Ok(Err::<(), _>(e).with_file_context(
            FileOperation::Remove,
            path,
            "removing directory tree",
            "utils::fs::remove_dir_all",
        )?),
    }
}

/// Removes a single file; a missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Ok(Err::<(), _>(e).with_file_context(
            FileOperation::Remove,
            path,
            "removing file",
            "utils::fs::remove_file_if_exists",
        )?),
    }
}

/// Removes `path` (if present) and recreates it as an empty directory.
///
/// # Errors
///
/// Returns an error if the old tree cannot be removed or the directory cannot
/// be created.
pub fn recreate_dir(path: &Path) -> Result<()> {
    remove_dir_all(path)?;
    ensure_dir(path)
}

/// Copies one regular file, creating the destination's parent directories.
///
/// # Errors
///
/// Returns an error if the parent cannot be created or the copy fails.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).with_file_context(
        FileOperation::Copy,
        src,
        format!("copying to {}", dst.display()),
        "utils::fs::copy_file",
    )?;
    Ok(())
}
