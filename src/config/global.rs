//! Global configuration (`~/.addonpack/config.toml`).
//!
//! The file is optional; every field has a default. The location can be
//! overridden with the `ADDONPACK_CONFIG` environment variable.
//!
//! ```toml
//! max_parallel = 8
//! attribution_marker = "## X-Curse-Project-ID:"
//!
//! [[svn.transient_errors]]
//! pattern = "E175002"
//! action = "delay"
//!
//! [[svn.transient_errors]]
//! pattern = "Directory not empty"
//! action = "remove-and-retry"
//! ```
//!
//! Supplying `svn.transient_errors` replaces the built-in table entirely.

use crate::constants::{DEFAULT_ATTRIBUTION_MARKER, TOOL_DIR, default_max_parallel};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// User-wide settings for fetching externals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Upper bound on dependencies fetched concurrently.
    ///
    /// Default: `max(10, 2 × CPU cores)`
    pub max_parallel: usize,

    /// Marker string searched for when an attribution slug must be discovered
    /// from the files of a checkout.
    pub attribution_marker: String,

    /// Subversion driver settings.
    pub svn: SvnConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            attribution_marker: DEFAULT_ATTRIBUTION_MARKER.to_string(),
            svn: SvnConfig::default(),
        }
    }
}

/// Settings of the centralized (svn) checkout driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SvnConfig {
    /// Failure signatures that make a checkout or update eligible for a retry.
    pub transient_errors: Vec<TransientSignature>,
}

impl Default for SvnConfig {
    fn default() -> Self {
        let delay = |pattern: &str| TransientSignature {
            pattern: pattern.to_string(),
            action: RetryAction::Delay,
        };
        let remove = |pattern: &str| TransientSignature {
            pattern: pattern.to_string(),
            action: RetryAction::RemoveAndRetry,
        };

        Self {
            transient_errors: vec![
                // Server sent an unexpected response (e.g. 502 from a proxy)
                delay("E175002"),
                // Connection reset / unable to connect
                delay("E170013"),
                // Connection timed out
                delay("E175012"),
                // Working copy directory left behind by an interrupted checkout
                remove("E000039"),
                remove("Directory not empty"),
            ],
        }
    }
}

impl SvnConfig {
    /// Classify the output of a failed svn command.
    ///
    /// Returns the action of the first signature whose pattern occurs in
    /// `output`, or `None` when the failure is not transient.
    #[must_use]
    pub fn classify(&self, output: &str) -> Option<RetryAction> {
        self.transient_errors
            .iter()
            .find(|signature| output.contains(&signature.pattern))
            .map(|signature| signature.action)
    }
}

/// One recognized transient failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransientSignature {
    /// Substring (usually an svn error code) looked for in the command output.
    pub pattern: String,
    /// What to do before the next attempt.
    pub action: RetryAction,
}

/// Recovery performed before retrying a transient svn failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetryAction {
    /// Wait with exponential backoff, then retry.
    Delay,
    /// Remove the whole working copy, then retry from a fresh checkout.
    RemoveAndRetry,
}

impl GlobalConfig {
    /// Load the global configuration from its default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load the global configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(crate::core::PackError::from)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;

        Ok(config.normalized())
    }

    /// Default location: `ADDONPACK_CONFIG`, else `~/.addonpack/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(super::CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(TOOL_DIR).join("config.toml"))
    }

    fn normalized(mut self) -> Self {
        if self.max_parallel == 0 {
            self.max_parallel = 1;
        }
        if self.attribution_marker.trim().is_empty() {
            self.attribution_marker = DEFAULT_ATTRIBUTION_MARKER.to_string();
        }
        self
    }
}
