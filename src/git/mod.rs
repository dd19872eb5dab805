//! Git operations wrapper
//!
//! An async wrapper around the system `git` binary. Using the installed git
//! (rather than an embedded implementation) means externals are fetched with
//! the user's existing credentials helpers, SSH agent and proxy settings.
//!
//! [`GitRepo`] is a handle to one cached clone; each method maps to one or two
//! git invocations built with [`GitCommand`]. All failures surface as
//! [`PackError`] variants inside `anyhow::Error`.
//!
//! ```rust,no_run
//! use addonpack::git::GitRepo;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repo = GitRepo::clone("https://github.com/owner/lib", "/cache/slot")
//!     .await?
//!     .with_context("Libs/Lib");
//! let branch = repo.default_branch("https://github.com/owner/lib").await?;
//! repo.checkout_branch(&branch, "https://github.com/owner/lib").await?;
//! # Ok(())
//! # }
//! ```

pub mod command_builder;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::core::PackError;
pub use command_builder::{GitCommand, GitCommandOutput};

/// Length of a full SHA-1 commit hash.
pub const FULL_HASH_LEN: usize = 40;

/// Minimum length of an abbreviated commit hash.
pub const MIN_ABBREVIATED_HASH_LEN: usize = 7;

/// Handle to a local git clone.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    context: Option<String>,
}

impl GitRepo {
    /// Handle to an existing clone at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            context: None,
        }
    }

    /// Prefix git log lines with `context` (usually the destination path).
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Path of the working tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` contains a `.git` directory.
    #[must_use]
    pub fn is_git_repo(&self) -> bool {
        is_valid_git_repo(&self.path)
    }

    fn command(&self, cmd: GitCommand) -> GitCommand {
        let cmd = cmd.current_dir(&self.path);
        match &self.context {
            Some(ctx) => cmd.with_context(ctx.clone()),
            None => cmd,
        }
    }

    /// Clone `url` into `target` without checking out a working tree.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCloneFailed`] if git cannot clone the URL.
    pub async fn clone(url: &str, target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref();
        GitCommand::clone(url, target).execute_success().await?;
        Ok(Self::new(target))
    }

    /// Fetch all branches and tags from `origin`, pruning deleted references.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCommandError`] if the fetch fails.
    pub async fn fetch(&self) -> Result<()> {
        self.command(GitCommand::fetch()).execute_success().await
    }

    /// Whether a revision expression resolves in this clone.
    pub async fn has_rev(&self, rev: &str) -> bool {
        self.command(GitCommand::verify_ref(rev)).execute_success().await.is_ok()
    }

    /// Check out `origin/<branch>` as local branch `branch`, discarding local state.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::ReferenceNotFound`] if the remote branch does not
    /// exist, or a git error if the checkout fails.
    pub async fn checkout_branch(&self, branch: &str, url: &str) -> Result<()> {
        let remote_ref = format!("refs/remotes/origin/{branch}");
        if !self.has_rev(&format!("{remote_ref}^{{commit}}")).await {
            return Err(PackError::ReferenceNotFound {
                url: url.to_string(),
                reference: branch.to_string(),
            }
            .into());
        }

        self.command(GitCommand::checkout_branch(branch, &remote_ref))
            .execute_success()
            .await
            .with_context(|| format!("Failed to check out branch '{branch}'"))
    }

    /// Check out tag `tag` as a detached HEAD.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::ReferenceNotFound`] if the tag does not exist.
    pub async fn checkout_tag(&self, tag: &str, url: &str) -> Result<()> {
        let tag_ref = format!("refs/tags/{tag}");
        if !self.has_rev(&format!("{tag_ref}^{{commit}}")).await {
            return Err(PackError::ReferenceNotFound {
                url: url.to_string(),
                reference: tag.to_string(),
            }
            .into());
        }

        self.checkout_detached(&tag_ref).await
    }

    /// Check out a revision as a detached HEAD, discarding local state.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCommandError`] if the checkout fails.
    pub async fn checkout_detached(&self, rev: &str) -> Result<()> {
        self.command(GitCommand::checkout_detached(rev))
            .execute_success()
            .await
            .with_context(|| format!("Failed to check out '{rev}'"))
    }

    /// All commit hashes reachable from any reference, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCommandError`] if the history cannot be listed.
    pub async fn commit_hashes(&self) -> Result<Vec<String>> {
        let stdout = self.command(GitCommand::rev_list_all()).execute_stdout().await?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    /// Name of the remote's default branch.
    ///
    /// Reads `refs/remotes/origin/HEAD`; if the clone has no such pointer the
    /// remote is asked once with `git remote set-head origin --auto`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::NoDefaultBranch`] if no unambiguous default exists.
    pub async fn default_branch(&self, url: &str) -> Result<String> {
        if let Some(branch) = self.read_remote_head().await {
            return Ok(branch);
        }

        tracing::debug!("Remote HEAD not recorded for {url}, querying remote");
        if let Err(e) = self.command(GitCommand::set_remote_head()).execute_success().await {
            tracing::debug!("git remote set-head failed: {e:#}");
        }

        self.read_remote_head().await.ok_or_else(|| {
            PackError::NoDefaultBranch {
                url: url.to_string(),
            }
            .into()
        })
    }

    async fn read_remote_head(&self) -> Option<String> {
        let target = self.command(GitCommand::remote_head()).execute_stdout().await.ok()?;
        target
            .strip_prefix("refs/remotes/origin/")
            .filter(|branch| !branch.is_empty())
            .map(str::to_string)
    }

    /// Most recently created tag, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCommandError`] if the tags cannot be listed.
    pub async fn latest_tag(&self) -> Result<Option<String>> {
        let tag = self.command(GitCommand::latest_tag()).execute_stdout().await?;
        Ok(Some(tag).filter(|t| !t.is_empty()))
    }

    /// Name of the checked out branch, `None` when HEAD is detached.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCommandError`] if git fails.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let branch = self.command(GitCommand::current_branch()).execute_stdout().await?;
        Ok(Some(branch).filter(|b| !b.is_empty()))
    }

    /// Hash of the checked out commit.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCommandError`] if git fails.
    pub async fn current_commit(&self) -> Result<String> {
        self.command(GitCommand::current_commit())
            .execute_stdout()
            .await
            .context("Failed to get current commit")
    }
}

/// Whether `value` is a full 40-character hexadecimal commit hash.
#[must_use]
pub fn is_full_hash(value: &str) -> bool {
    value.len() == FULL_HASH_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// First hash in `hashes` starting with `prefix` (case-insensitive).
#[must_use]
pub fn find_commit_by_prefix<'a, I>(hashes: I, prefix: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.to_ascii_lowercase();
    hashes.into_iter().find(|hash| hash.to_ascii_lowercase().starts_with(&prefix))
}

/// Checks if git is installed and responds to `--version`.
#[must_use]
pub fn is_git_installed() -> bool {
    std::process::Command::new(crate::utils::platform::get_git_command())
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Fails with [`PackError::GitNotFound`] if git is unavailable.
///
/// # Errors
///
/// Returns [`PackError::GitNotFound`] when [`is_git_installed`] is false.
pub fn ensure_git_available() -> Result<(), PackError> {
    if !is_git_installed() {
        return Err(PackError::GitNotFound);
    }
    Ok(())
}

/// Checks if a directory contains a git repository.
#[must_use]
pub fn is_valid_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}
