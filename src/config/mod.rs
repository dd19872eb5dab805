//! Configuration for addonpack
//!
//! Two concerns live here:
//!
//! 1. **Cache location** - [`get_externals_cache_dir`] resolves the single
//!    process-wide root below which every external dependency is checked out.
//! 2. **Global configuration** (`~/.addonpack/config.toml`) - [`GlobalConfig`]
//!    holds user-wide tuning: fetch parallelism, the attribution marker and the
//!    table of transient svn failures that are retried.
//!
//! # Cache Root Resolution
//!
//! First match wins:
//!
//! 1. `ADDONPACK_CACHE_DIR` environment variable
//! 2. `$RUNNER_TEMP/.addonpack/.cache/externals` when running under GitHub Actions
//! 3. `$HOME/.addonpack/.cache/externals`
//!
//! CI runners get the temp directory so that cache contents do not leak between
//! jobs sharing a home directory. The directory itself is created lazily by
//! [`crate::cache::CacheStore::ensure_root`].

mod global;

pub use global::{GlobalConfig, RetryAction, SvnConfig, TransientSignature};

use crate::constants::TOOL_DIR;
use anyhow::Result;
use std::path::PathBuf;

/// Environment variable overriding the externals cache root.
pub const CACHE_DIR_ENV: &str = "ADDONPACK_CACHE_DIR";

/// Environment variable overriding the global configuration file location.
pub const CONFIG_PATH_ENV: &str = "ADDONPACK_CONFIG";

/// Environment variable forcing every staleness marker to be ignored.
pub const FORCE_EXTERNALS_ENV: &str = "ADDONPACK_FORCE_EXTERNALS";

/// Resolve the root directory of the externals cache.
///
/// The directory is not created here.
///
/// # Errors
///
/// Returns an error if no override is set and the home directory cannot be
/// determined.
pub fn get_externals_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let base = match ci_temp_dir() {
        Some(dir) => dir,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?,
    };

    Ok(base.join(TOOL_DIR).join(".cache").join("externals"))
}

/// Temp directory provided by a GitHub Actions runner, if running under one.
fn ci_temp_dir() -> Option<PathBuf> {
    std::env::var_os("GITHUB_ACTIONS")?;
    std::env::var_os("RUNNER_TEMP").filter(|dir| !dir.is_empty()).map(PathBuf::from)
}

/// Whether the process environment requests a forced refresh of all externals.
#[must_use]
pub fn force_externals_from_env() -> bool {
    std::env::var(FORCE_EXTERNALS_ENV)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
