//! Staleness markers
//!
//! A marker is a small file inside a cache slot holding the RFC-3339 time of
//! the last successful checkout or update. A slot is fresh while its marker is
//! younger than [`CACHE_VALIDITY_WINDOW`]; anything else (absent, unreadable,
//! unparseable or expired) is stale, and a marker found stale for any reason
//! other than absence is deleted on the spot.
//!
//! ```text
//! <slot>/.lastUpdated              # Default selector
//! <slot>/.lastUpdated_v1.2.3       # keyed to the selector literal
//! <slot>/.lastUpdated_GetTag_v1.3  # svn latest-tag discovery
//! ```

use crate::constants::{CACHE_VALIDITY_WINDOW, LAST_UPDATED_PREFIX, TAG_DISCOVERY_PREFIX};
use crate::utils::fs::{atomic_write, remove_file_if_exists};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Freshness tracker for one `(cache slot, selector)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessMarker {
    path: PathBuf,
}

impl StalenessMarker {
    /// Marker at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Marker of `slot` keyed to a selector literal (`""` for the default branch).
    #[must_use]
    pub fn for_slot(slot: &Path, selector: &str) -> Self {
        let name = if selector.is_empty() {
            LAST_UPDATED_PREFIX.to_string()
        } else {
            format!("{LAST_UPDATED_PREFIX}_{}", sanitize_component(selector))
        };
        Self::new(slot.join(name))
    }

    /// Tag-discovery marker of `slot` recording `tag` in its file name.
    #[must_use]
    pub fn for_discovered_tag(slot: &Path, tag: &str) -> Self {
        Self::new(slot.join(format!("{TAG_DISCOVERY_PREFIX}_{}", sanitize_component(tag))))
    }

    /// Location of the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the marker file is present, regardless of its content.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Record the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn write(&self) -> Result<()> {
        self.write_at(Utc::now())
    }

    /// Record `timestamp` as the time of the last successful update.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn write_at(&self, timestamp: DateTime<Utc>) -> Result<()> {
        let content = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write staleness marker {}", self.path.display()))
    }

    /// Delete the marker; a missing marker is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing marker cannot be removed.
    pub fn delete(&self) -> Result<()> {
        remove_file_if_exists(&self.path)
    }

    /// Whether the slot must be refreshed, judged at `now` against `window`.
    ///
    /// Corrupt or expired markers are removed as a side effect. Marker
    /// problems are never errors: a failure to read or delete is logged and
    /// the slot is reported stale.
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                tracing::warn!("Unreadable staleness marker {}: {e}", self.path.display());
                self.discard();
                return true;
            }
        };

        let written = match DateTime::parse_from_rfc3339(content.trim()) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!("Corrupt staleness marker {}: {e}", self.path.display());
                self.discard();
                return true;
            }
        };

        let age = now.signed_duration_since(written);
        let expired = age.to_std().map(|age| age > window).unwrap_or(false);
        if expired {
            tracing::debug!("Staleness marker {} expired ({age})", self.path.display());
            self.discard();
        }
        expired
    }

    /// Whether the slot must be refreshed now, using the standard 24-hour window.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now(), CACHE_VALIDITY_WINDOW)
    }

    fn discard(&self) {
        if let Err(e) = self.delete() {
            tracing::warn!("Failed to remove staleness marker {}: {e:#}", self.path.display());
        }
    }
}

/// All tag-discovery markers currently present in `slot`.
///
/// # Errors
///
/// Returns an error if the glob pattern cannot be built or the slot cannot be
/// listed.
pub fn discovery_markers(slot: &Path) -> Result<Vec<StalenessMarker>> {
    let pattern = format!(
        "{}/{TAG_DISCOVERY_PREFIX}_*",
        glob::Pattern::escape(&slot.to_string_lossy())
    );

    let mut markers = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid tag discovery pattern")? {
        let path = entry.context("Failed to list tag discovery markers")?;
        if path.is_file() {
            markers.push(StalenessMarker::new(path));
        }
    }
    Ok(markers)
}

/// Tag encoded in a discovery marker's file name.
#[must_use]
pub fn discovered_tag(marker: &StalenessMarker) -> Option<String> {
    marker
        .path()
        .file_name()?
        .to_str()?
        .strip_prefix(TAG_DISCOVERY_PREFIX)?
        .strip_prefix('_')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
}

/// Replace path separators so a selector can be used inside a file name.
fn sanitize_component(value: &str) -> String {
    value.replace(['/', '\\'], "_")
}
