//! Shared on-disk cache of external dependency checkouts
//!
//! The cache is a flat directory of **slots**, one per `(canonical URL,
//! selector)` pair. A slot holds a complete checkout plus its staleness
//! markers and is reused by every later build that asks for the same
//! dependency.
//!
//! ```text
//! ~/.addonpack/.cache/externals/
//! ├── https:__github.com_owner_lib_v1.2.0/
//! │   ├── .git/
//! │   └── .lastUpdated_v1.2.0
//! └── https:__repos.curseforge.com_wow_libstub_trunk_/
//!     ├── .svn/
//!     ├── .lastUpdated
//!     └── .lastUpdated_GetTag_1.0.3
//! ```
//!
//! Slots are never deleted automatically; only [`CacheStore::clear`] removes
//! them. The store is an explicit value handed to the normalizer, the drivers
//! and the orchestrator, so tests point it at a temporary directory with
//! [`CacheStore::with_root`].

pub mod marker;

pub use marker::StalenessMarker;

use crate::config::get_externals_cache_dir;
use crate::utils::fs::{ensure_dir, remove_dir_all};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Handle to the externals cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Cache store at the default location (see [`get_externals_cache_dir`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root cannot be resolved.
    pub fn new() -> Result<Self> {
        Ok(Self::with_root(get_externals_cache_dir()?))
    }

    /// Cache store rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root if it does not exist yet. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_root(&self) -> Result<()> {
        ensure_dir(&self.root)
            .with_context(|| format!("Failed to create cache root {}", self.root.display()))
    }

    /// Deterministic slot directory for a canonical URL and selector literal.
    #[must_use]
    pub fn slot_path(&self, canonical_url: &str, selector: &str) -> PathBuf {
        self.root.join(slot_name(canonical_url, selector))
    }

    /// Remove the entire cache. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root exists but cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        remove_dir_all(&self.root)
            .with_context(|| format!("Failed to clear cache {}", self.root.display()))?;
        tracing::info!("Cleared externals cache at {}", self.root.display());
        Ok(true)
    }
}

/// Filesystem-safe slot directory name for `canonical_url` + `"_"` + `selector`.
///
/// Path separators become `_`, so one slot is always a single directory level.
#[must_use]
pub fn slot_name(canonical_url: &str, selector: &str) -> String {
    format!("{canonical_url}_{selector}")
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if cfg!(windows) && matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') => '_',
            c => c,
        })
        .collect()
}
