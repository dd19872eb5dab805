//! Command-line interface for addonpack.
//!
//! # Available Commands
//!
//! - `fetch` - Fetch every external declared in the packaging metadata into
//!   the package directory
//! - `cache` - Show or clear the shared externals cache
//!
//! ```bash
//! # Fetch externals into ./.release/<package-as>
//! addonpack fetch
//!
//! # Ignore the 24h cache and print a machine-readable report
//! addonpack fetch --force-externals --json
//!
//! # Only validate the declarations
//! addonpack fetch --skip-externals
//!
//! # Start from scratch
//! addonpack cache clear
//! ```
//!
//! Global flags (`--verbose`, `--quiet`, `--config`) are turned into
//! environment variables by [`CliConfig::apply_to_env`] before the command
//! runs, so library code only ever reads the environment.

mod cache;
mod fetch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::CONFIG_PATH_ENV;

/// Settings derived from the global flags, applied to the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Value for `RUST_LOG`; `None` keeps the current value.
    pub log_level: Option<String>,

    /// Custom path to the global configuration file (`ADDONPACK_CONFIG`).
    pub config_path: Option<String>,
}

impl CliConfig {
    /// Create a new CLI configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this configuration to the process environment.
    ///
    /// Must run before any worker threads read the environment.
    pub fn apply_to_env(&self) {
        if let Some(ref level) = self.log_level {
            // SAFETY: called once at startup from the main thread, before the
            // fetch spawns any tasks that read the environment.
            unsafe { std::env::set_var("RUST_LOG", level) };
        }

        if let Some(ref path) = self.config_path {
            // SAFETY: as above.
            unsafe { std::env::set_var(CONFIG_PATH_ENV, path) };
        }
    }
}

/// Install the stderr log subscriber, filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` only errors are shown. Calling this twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Fetch and vendor external dependencies of addon projects.
#[derive(Parser)]
#[command(
    name = "addonpack",
    about = "Fetch and cache the external libraries of an addon project",
    version,
    long_about = "addonpack resolves the externals declared in pkgmeta.yml or .pkgmeta, \
                  keeps git and svn checkouts in a shared 24-hour cache and copies them \
                  into the package directory."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all externals declared in the packaging metadata
    Fetch(fetch::FetchCommand),

    /// Manage the externals cache
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` renders it with
    /// [`crate::core::user_friendly_error`].
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.apply_to_env();
        init_logging();

        match self.command {
            Commands::Fetch(cmd) => cmd.execute().await,
            Commands::Cache(cmd) => cmd.execute(),
        }
    }

    /// Map the global flags to a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }
}
