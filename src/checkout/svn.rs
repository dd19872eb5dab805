//! Centralized-backend (svn) checkout driver

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::CheckoutOptions;
use super::slug::discover_slug_blocking;
use crate::cache::StalenessMarker;
use crate::cache::marker::{discovered_tag, discovery_markers};
use crate::config::{RetryAction, SvnConfig};
use crate::constants::SVN_MAX_ATTEMPTS;
use crate::core::PackError;
use crate::external::{CheckoutResult, CheckoutSelector, ExternalDependencySpec};
use crate::svn::{self, SvnCommand};
use crate::utils::backoff::backoff_delay;
use crate::utils::fs::remove_dir_all;

/// What a selector turned into for this checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckoutPlan {
    /// URL passed to `svn checkout`
    url: String,
    /// Revision passed with `-r`
    revision: Option<String>,
    /// Effective selector, also the key of the staleness marker
    resolved: CheckoutSelector,
}

/// Keeps one svn dependency's working copy in sync with its selector.
#[derive(Debug)]
pub struct SvnDriver {
    spec: ExternalDependencySpec,
    options: CheckoutOptions,
}

impl SvnDriver {
    /// Driver for `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::SvnNotFound`] if svn is not installed.
    pub fn new(spec: ExternalDependencySpec, options: CheckoutOptions) -> Result<Self, PackError> {
        svn::ensure_svn_available()?;
        Ok(Self {
            spec,
            options,
        })
    }

    /// The dependency handled by this driver.
    #[must_use]
    pub const fn spec(&self) -> &ExternalDependencySpec {
        &self.spec
    }

    /// Check out or update the working copy, then look for an attribution slug.
    ///
    /// # Errors
    ///
    /// Returns an error when the latest tag cannot be determined or svn keeps
    /// failing after the transient-failure retries.
    pub async fn checkout(&self) -> Result<CheckoutResult> {
        let spec = &self.spec;
        let plan = self.plan().await?;
        let path = self.result_path(&plan);
        let marker = StalenessMarker::for_slot(&spec.cache_slot, plan.resolved.literal());

        if self.options.force {
            marker.delete()?;
        }

        let from_cache = !marker.is_stale() && svn::is_working_copy(&spec.cache_slot);
        if from_cache {
            tracing::debug!("({}) Cache is up-to-date for {}", spec.dest_path, spec.url);
        } else {
            self.sync(&plan).await.with_context(|| format!("Failed to sync cache for {}", plan.url))?;
            marker.write()?;
            tracing::debug!("({}) svn checkout successful: {}", spec.dest_path, plan.resolved);
        }

        let attribution_slug = match &spec.attribution_slug {
            Some(slug) => Some(slug.clone()),
            None => discover_slug_blocking(path.clone(), self.options.attribution_marker.clone()).await?,
        };

        Ok(CheckoutResult {
            resolved: plan.resolved,
            path,
            from_cache,
            attribution_slug,
        })
    }

    async fn plan(&self) -> Result<CheckoutPlan> {
        let spec = &self.spec;
        let plan = match &spec.selector {
            CheckoutSelector::Branch(name) => CheckoutPlan {
                url: svn::branch_url(&spec.url, name),
                revision: None,
                resolved: CheckoutSelector::Branch(name.clone()),
            },
            CheckoutSelector::Tag(name) => {
                let tag = if spec.selector.is_latest_tag() {
                    self.latest_tag().await?
                } else {
                    name.clone()
                };
                CheckoutPlan {
                    url: svn::tag_url(&spec.url, &tag, spec.subpath.as_deref()),
                    revision: None,
                    resolved: CheckoutSelector::Tag(tag),
                }
            }
            CheckoutSelector::Commit(rev) => CheckoutPlan {
                url: spec.url.clone(),
                revision: Some(rev.clone()),
                resolved: CheckoutSelector::Commit(rev.clone()),
            },
            CheckoutSelector::Default => CheckoutPlan {
                url: spec.url.clone(),
                revision: None,
                resolved: CheckoutSelector::Branch(svn::TRUNK.to_string()),
            },
        };
        Ok(plan)
    }

    /// Directory holding the dependency's files once checked out.
    ///
    /// Nested under the slot when the subpath is not part of the checked-out URL.
    fn result_path(&self, plan: &CheckoutPlan) -> PathBuf {
        let spec = &self.spec;
        match spec.subpath.as_deref() {
            Some(subpath) if !plan.url.contains(subpath) => {
                tracing::warn!(
                    "{}: Path {subpath} not found in URL {} - a specific URL is generally more performant for svn checkouts",
                    spec.dest_path,
                    spec.url
                );
                if spec.url.contains("/trunk") {
                    tracing::warn!(
                        "Example:\n\t# .pkgmeta\n\texternals:\n\t  {}: {}/{subpath}",
                        spec.dest_path,
                        spec.url.trim_end_matches('/')
                    );
                }
                spec.cache_slot.join(subpath)
            }
            _ => spec.cache_slot.clone(),
        }
    }

    /// Most recent tag, using the tag-discovery marker to avoid querying the
    /// repository on every build.
    async fn latest_tag(&self) -> Result<String> {
        let spec = &self.spec;
        let slot = &spec.cache_slot;

        let mut markers = discovery_markers(slot)?;
        if markers.len() > 1 {
            tracing::debug!("({}) Removing {} duplicate tag markers", spec.dest_path, markers.len());
            for marker in &markers {
                marker.delete()?;
            }
            markers.clear();
        }

        if let Some(marker) = markers.pop() {
            if self.options.force {
                marker.delete()?;
            } else if !marker.is_stale() {
                if let Some(tag) = discovered_tag(&marker) {
                    tracing::debug!("({}) Using cached latest tag {tag}", spec.dest_path);
                    return Ok(tag);
                }
            }
        }

        let tag = svn::latest_tag(&spec.url, &spec.dest_path).await?.ok_or_else(|| {
            PackError::LatestTagNotFound {
                url: spec.url.clone(),
            }
        })?;

        crate::utils::fs::ensure_dir(slot)?;
        StalenessMarker::for_discovered_tag(slot, &tag).write()?;
        tracing::debug!("({}) Latest tag is {tag}", spec.dest_path);
        Ok(tag)
    }

    /// Check out or switch the working copy to the planned URL.
    async fn sync(&self, plan: &CheckoutPlan) -> Result<()> {
        let spec = &self.spec;
        let slot = &spec.cache_slot;
        let revision = plan.revision.as_deref();

        retry_transient(slot, &self.options.svn, &spec.dest_path, |working_copy| {
            let command = if working_copy {
                tracing::debug!("({}) Updating repository cache for {}", spec.dest_path, plan.url);
                SvnCommand::switch(&plan.url, revision).current_dir(slot)
            } else {
                tracing::debug!("({}) Checking out {} into cache: {}", spec.dest_path, plan.url, slot.display());
                SvnCommand::checkout(&plan.url, slot, revision)
            };
            command.with_context(spec.dest_path.clone()).execute_success()
        })
        .await
    }
}

/// Run `attempt` until it succeeds, retrying failures `svn_config` recognizes
/// as transient, at most [`SVN_MAX_ATTEMPTS`] times.
///
/// `attempt` is told whether `slot` holds a working copy, so a slot removed by
/// [`RetryAction::RemoveAndRetry`] is checked out from scratch.
async fn retry_transient<F, Fut>(slot: &Path, svn_config: &SvnConfig, dest: &str, mut attempt: F) -> Result<()>
where
    F: FnMut(bool) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempts = 0;
    loop {
        let error = match attempt(svn::is_working_copy(slot)).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        attempts += 1;
        let Some(action) = svn_config.classify(&svn::failure_output(&error)) else {
            return Err(error);
        };
        if attempts >= SVN_MAX_ATTEMPTS {
            return Err(error.context(format!("svn failed after {attempts} attempts")));
        }

        tracing::debug!("({dest}) Transient svn failure ({action:?}), retrying: {error:#}");
        match action {
            RetryAction::Delay => tokio::time::sleep(backoff_delay(attempts - 1)).await,
            RetryAction::RemoveAndRetry => remove_dir_all(slot)?,
        }
    }
}
