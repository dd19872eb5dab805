//! Distributed-backend (git) checkout driver

use anyhow::{Context, Result};

use super::CheckoutOptions;
use crate::cache::StalenessMarker;
use crate::core::PackError;
use crate::external::{CheckoutResult, CheckoutSelector, ExternalDependencySpec};
use crate::git::{self, GitRepo, MIN_ABBREVIATED_HASH_LEN};
use crate::utils::fs::remove_dir_all;

/// Keeps one git dependency's cache slot in sync with its selector.
#[derive(Debug)]
pub struct GitDriver {
    spec: ExternalDependencySpec,
    options: CheckoutOptions,
}

impl GitDriver {
    /// Driver for `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitNotFound`] if git is not installed.
    pub fn new(spec: ExternalDependencySpec, options: CheckoutOptions) -> Result<Self, PackError> {
        git::ensure_git_available()?;
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

    fn marker(&self) -> StalenessMarker {
        StalenessMarker::for_slot(&self.spec.cache_slot, self.spec.selector.literal())
    }

    fn repo(&self) -> GitRepo {
        GitRepo::new(&self.spec.cache_slot).with_context(self.spec.dest_path.clone())
    }

    /// Clone or update the slot and check out the selector.
    ///
    /// # Errors
    ///
    /// Returns a clone/fetch error, or a resolution error when the selector
    /// names a branch, tag or commit that does not exist.
    pub async fn checkout(&self) -> Result<CheckoutResult> {
        let spec = &self.spec;
        let marker = self.marker();

        if self.options.force {
            marker.delete()?;
        }

        if !marker.is_stale() && git::is_valid_git_repo(&spec.cache_slot) {
            tracing::debug!("({}) Cache is up-to-date for {}", spec.dest_path, spec.url);
            let resolved = self.resolve_cached().await?;
            return Ok(self.result(resolved, true));
        }

        let repo = self.sync().await.with_context(|| format!("Failed to sync cache for {}", spec.url))?;
        let resolved = self.check_out(&repo).await?;

        marker.write()?;
        tracing::debug!("({}) git checkout successful: {resolved}", spec.dest_path);
        Ok(self.result(resolved, false))
    }

    /// Clone into an empty slot, fetch into an existing clone.
    async fn sync(&self) -> Result<GitRepo> {
        let spec = &self.spec;
        let slot = &spec.cache_slot;

        if git::is_valid_git_repo(slot) {
            tracing::debug!("({}) Fetching latest changes in cache for {}", spec.dest_path, spec.url);
            let repo = self.repo();
            repo.fetch().await?;
            return Ok(repo);
        }

        if slot.exists() {
            tracing::debug!("({}) Removing incomplete cache slot {}", spec.dest_path, slot.display());
            remove_dir_all(slot)?;
        }

        tracing::debug!("({}) Cloning {} into cache: {}", spec.dest_path, spec.url, slot.display());
        if let Err(e) = GitRepo::clone(&spec.url, slot).await {
            if let Err(cleanup) = remove_dir_all(slot) {
                tracing::warn!("Failed to clean up {}: {cleanup:#}", slot.display());
            }
            return Err(e);
        }
        Ok(self.repo())
    }

    /// Check out the selector in a synced clone and return what it resolved to.
    async fn check_out(&self, repo: &GitRepo) -> Result<CheckoutSelector> {
        let url = &self.spec.url;
        match &self.spec.selector {
            CheckoutSelector::Branch(branch) => {
                tracing::debug!("({}) Checking out branch {branch}", self.spec.dest_path);
                repo.checkout_branch(branch, url).await?;
                Ok(CheckoutSelector::Branch(branch.clone()))
            }
            selector @ CheckoutSelector::Tag(_) if selector.is_latest_tag() => {
                let tag = repo.latest_tag().await?.ok_or_else(|| PackError::LatestTagNotFound {
                    url: url.clone(),
                })?;
                tracing::debug!("({}) Latest tag is {tag}", self.spec.dest_path);
                repo.checkout_tag(&tag, url).await?;
                Ok(CheckoutSelector::Tag(tag))
            }
            CheckoutSelector::Tag(tag) => {
                tracing::debug!("({}) Checking out tag {tag}", self.spec.dest_path);
                repo.checkout_tag(tag, url).await?;
                Ok(CheckoutSelector::Tag(tag.clone()))
            }
            CheckoutSelector::Commit(commit) => {
                let hash = self.resolve_commit(repo, commit).await?;
                tracing::debug!("({}) Checking out commit {hash}", self.spec.dest_path);
                repo.checkout_detached(&hash).await?;
                Ok(CheckoutSelector::Commit(hash))
            }
            CheckoutSelector::Default => {
                let branch = repo.default_branch(url).await?;
                tracing::debug!("({}) Checking out default branch {branch}", self.spec.dest_path);
                repo.checkout_branch(&branch, url).await?;
                Ok(CheckoutSelector::Branch(branch))
            }
        }
    }

    /// Full hash for an exact or abbreviated commit.
    async fn resolve_commit(&self, repo: &GitRepo, commit: &str) -> Result<String> {
        let url = &self.spec.url;

        if git::is_full_hash(commit) {
            let hash = commit.to_ascii_lowercase();
            if !repo.has_rev(&format!("{hash}^{{commit}}")).await {
                return Err(PackError::CommitNotFound {
                    url: url.clone(),
                    prefix: commit.to_string(),
                }
                .into());
            }
            return Ok(hash);
        }

        if commit.len() < MIN_ABBREVIATED_HASH_LEN || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PackError::InvalidCommit {
                reference: commit.to_string(),
            }
            .into());
        }

        let hashes = repo.commit_hashes().await?;
        git::find_commit_by_prefix(hashes.iter().map(String::as_str), commit)
            .map(str::to_string)
            .ok_or_else(|| {
                PackError::CommitNotFound {
                    url: url.clone(),
                    prefix: commit.to_string(),
                }
                .into()
            })
    }

    /// Effective selector of a fresh slot, read from the local clone only.
    async fn resolve_cached(&self) -> Result<CheckoutSelector> {
        let repo = self.repo();
        match &self.spec.selector {
            CheckoutSelector::Default => Ok(repo
                .current_branch()
                .await?
                .map_or(CheckoutSelector::Default, CheckoutSelector::Branch)),
            selector @ CheckoutSelector::Tag(_) if selector.is_latest_tag() => {
                Ok(repo.latest_tag().await?.map_or_else(|| selector.clone(), CheckoutSelector::Tag))
            }
            CheckoutSelector::Commit(_) => Ok(CheckoutSelector::Commit(repo.current_commit().await?)),
            other => Ok(other.clone()),
        }
    }

    fn result(&self, resolved: CheckoutSelector, from_cache: bool) -> CheckoutResult {
        CheckoutResult {
            resolved,
            path: self.spec.checkout_path(),
            from_cache,
            attribution_slug: self.spec.attribution_slug.clone(),
        }
    }
}
