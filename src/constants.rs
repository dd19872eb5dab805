//! Global constants used throughout the addonpack codebase.
//!
//! This module contains cache validity windows, retry parameters, marker file
//! names and other values that are shared by several modules. Defining them
//! centrally keeps magic numbers discoverable.

use std::time::Duration;

/// How long a successful checkout stays fresh before it is fetched again (24 hours).
///
/// Staleness is purely time-based: a cache slot whose marker is younger than
/// this window is reused without touching the network.
pub const CACHE_VALIDITY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// File name prefix of the per-slot staleness marker.
pub const LAST_UPDATED_PREFIX: &str = ".lastUpdated";

/// File name prefix of the svn latest-tag discovery marker.
///
/// The discovered tag is encoded in the file name itself, e.g.
/// `.lastUpdated_GetTag_v1.2.3`.
pub const TAG_DISCOVERY_PREFIX: &str = ".lastUpdated_GetTag";

/// Directory layout below the resolved home (or CI temp) directory.
pub const TOOL_DIR: &str = ".addonpack";

/// Maximum number of attempts for svn checkout, update and log operations.
pub const SVN_MAX_ATTEMPTS: u32 = 5;

/// Starting delay for exponential backoff (50ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 50;

/// Maximum backoff delay for exponential backoff (800ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 800;

/// Timeout for git clone operations (10 minutes).
///
/// Externals are full clones so that abbreviated commits can be resolved
/// against the complete history.
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for git fetch operations (5 minutes).
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for svn checkout and update operations (10 minutes).
pub const SVN_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(600);

/// Marker searched for when the attribution slug cannot be derived from the URL.
pub const DEFAULT_ATTRIBUTION_MARKER: &str = "## X-Curse-Project-ID:";

/// Number of leading bytes inspected to decide whether a file is binary.
pub const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Files larger than this are never scanned for the attribution marker (1 MiB).
pub const MAX_SCAN_FILE_SIZE: u64 = 1024 * 1024;

/// Minimum number of parallel fetches regardless of CPU count.
///
/// Fetching is dominated by network and subprocess I/O, so even a single-core
/// machine benefits from several dependencies in flight.
pub const MIN_PARALLELISM: usize = 10;

/// Multiplier applied to CPU core count for default parallelism.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Default CPU core count when detection fails.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Default bound for the number of dependencies fetched concurrently.
#[must_use]
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism().map_or(FALLBACK_CORE_COUNT, usize::from);
    std::cmp::max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parallelism_has_floor() {
        assert!(default_max_parallel() >= MIN_PARALLELISM);
    }

    #[test]
    fn test_validity_window_is_one_day() {
        assert_eq!(CACHE_VALIDITY_WINDOW.as_secs(), 86_400);
    }
}
