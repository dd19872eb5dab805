//! Test utilities for addonpack
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration test target.
//!
//! - [`init_test_logging`] installs a once-guarded tracing subscriber
//! - [`TestGit`] builds local git repositories reachable through `file://` URLs
//! - [`svn_available`] lets svn-dependent tests skip themselves

pub mod git_helper;

pub use git_helper::TestGit;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` if given, otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Whether the `svn` binary is on `PATH`.
#[must_use]
pub fn svn_available() -> bool {
    crate::utils::platform::command_exists(crate::utils::platform::get_svn_command())
}
