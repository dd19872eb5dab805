//! Checkout drivers
//!
//! One driver per hosting backend, dispatched through the [`Driver`] enum.
//! Every driver follows the same cache protocol around its own VCS calls:
//!
//! 1. Build the staleness marker for the resolved selector; delete it first
//!    when a forced refresh was requested.
//! 2. A fresh marker is a cache hit and skips the network entirely.
//! 3. Otherwise clone/check out into an empty slot, or update an existing one.
//! 4. Write the marker after success.
//!
//! Mercurial dependencies and unrecognized backends map to
//! [`Driver::Unsupported`], which warns and skips instead of failing the build.

pub mod git;
pub mod slug;
pub mod svn;

use anyhow::Result;

use crate::config::{GlobalConfig, SvnConfig};
use crate::constants::DEFAULT_ATTRIBUTION_MARKER;
use crate::core::PackError;
use crate::external::{Backend, CheckoutResult, ExternalDependencySpec};
pub use git::GitDriver;
pub use svn::SvnDriver;

/// Settings shared by every driver of one build.
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    /// Ignore staleness markers and refresh every slot
    pub force: bool,
    /// Marker text preceding an attribution slug inside a checkout
    pub attribution_marker: String,
    /// Transient failure classification for svn
    pub svn: SvnConfig,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            force: false,
            attribution_marker: DEFAULT_ATTRIBUTION_MARKER.to_string(),
            svn: SvnConfig::default(),
        }
    }
}

impl CheckoutOptions {
    /// Options taken from the global configuration.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            force: false,
            attribution_marker: config.attribution_marker.clone(),
            svn: config.svn.clone(),
        }
    }

    /// Set the forced-refresh flag.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Checkout driver for one dependency.
#[derive(Debug)]
pub enum Driver {
    /// Distributed backend (git)
    Git(GitDriver),
    /// Centralized backend (svn)
    Svn(SvnDriver),
    /// Backend without a driver; checkout is skipped with a warning
    Unsupported(ExternalDependencySpec),
}

impl Driver {
    /// Select and construct the driver for `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitNotFound`] or [`PackError::SvnNotFound`] when the
    /// backend's binary is not installed.
    pub fn for_spec(spec: &ExternalDependencySpec, options: &CheckoutOptions) -> Result<Self, PackError> {
        match spec.backend {
            Backend::DistributedVcs => Ok(Self::Git(GitDriver::new(spec.clone(), options.clone())?)),
            Backend::CentralizedVcs => Ok(Self::Svn(SvnDriver::new(spec.clone(), options.clone())?)),
            Backend::LegacyVcs | Backend::Unrecognized => Ok(Self::Unsupported(spec.clone())),
        }
    }

    /// The dependency this driver handles.
    #[must_use]
    pub fn spec(&self) -> &ExternalDependencySpec {
        match self {
            Self::Git(driver) => driver.spec(),
            Self::Svn(driver) => driver.spec(),
            Self::Unsupported(spec) => spec,
        }
    }

    /// Bring the dependency's cache slot up to date.
    ///
    /// Returns `None` for unsupported backends.
    ///
    /// # Errors
    ///
    /// Returns the driver's resolution or VCS error.
    pub async fn checkout(&self) -> Result<Option<CheckoutResult>> {
        match self {
            Self::Git(driver) => driver.checkout().await.map(Some),
            Self::Svn(driver) => driver.checkout().await.map(Some),
            Self::Unsupported(spec) => {
                let kind = match spec.backend {
                    Backend::LegacyVcs => "Mercurial externals are not supported yet",
                    _ => "Unknown external type",
                };
                tracing::warn!("{kind} ({}), skipping {}", spec.backend, spec.dest_path);
                Ok(None)
            }
        }
    }
}
