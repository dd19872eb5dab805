//! Type-safe Git command builder for consistent command execution
//!
//! Every git invocation made while fetching externals goes through
//! [`GitCommand`], which takes care of the working directory (`git -C`), the
//! timeout, logging under the `git` / `git::perf` targets and mapping failures
//! to [`PackError`] variants.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{GIT_CLONE_TIMEOUT, GIT_FETCH_TIMEOUT};
use crate::core::PackError;
use crate::utils::platform::get_git_command;

/// Builder for a single git invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use addonpack::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::current_commit()
///     .current_dir("/path/to/repo")
///     .with_context("Libs/LibStub")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// New commands capture output and time out after five minutes.
pub struct GitCommand {
    /// Command arguments to pass to git
    args: Vec<String>,

    /// Working directory, passed as `-C <dir>`
    current_dir: Option<PathBuf>,

    /// Environment variables to set for the git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for command completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Log prefix identifying the dependency, e.g. `Libs/LibStub`
    context: Option<String>,

    /// For clone commands, the URL for error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Never block on a credential prompt
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(GIT_FETCH_TIMEOUT),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Creates a new git command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory for git command execution.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context for logging (typically the dependency's destination path).
    ///
    /// ```text
    /// (Libs/LibStub) Executing command: git -C /cache/slot fetch --all --tags --prune
    /// ```
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Optional context as a log prefix.
    fn prefix(&self) -> String {
        self.context.as_ref().map(|ctx| format!("({ctx}) ")).unwrap_or_default()
    }

    /// Execute the command and return its output.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::GitCloneFailed`] for a failed clone,
    /// [`PackError::GitCommandError`] for any other non-zero exit or a timeout,
    /// and an IO error if git cannot be spawned.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let prefix = self.prefix();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());

        cmd.args(&full_args);
        tracing::debug!(
            target: "git",
            "{prefix}Executing command: {} {}",
            git_command,
            full_args.join(" ")
        );

        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let operation = self.args.first().cloned().unwrap_or_else(|| "unknown".to_string());
        let output_future = cmd.output();

        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
            } else {
                tracing::warn!(
                    target: "git",
                    "{prefix}Command timed out after {} seconds: git {}",
                    duration.as_secs(),
                    full_args.join(" ")
                );
                return Err(PackError::GitCommandError {
                    operation,
                    stderr: format!(
                        "Git command timed out after {} seconds. This may indicate:\n\
                        - Network connectivity issues\n\
                        - Authentication prompts waiting for input\n\
                        - Large repository operations taking too long\n\
                        Try running the command manually: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    ),
                }
                .into());
            }
        } else {
            output_future
                .await
                .with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();

            tracing::debug!(
                target: "git",
                "{prefix}Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "git", "{prefix}Error: {}", stderr.trim());
            }

            let error = if operation == "clone" {
                PackError::GitCloneFailed {
                    url: self.clone_url.unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                }
            } else {
                let detail = self.args.get(1).map(|arg| format!(" {arg}")).unwrap_or_default();
                PackError::GitCommandError {
                    operation: format!("{operation}{detail}"),
                    stderr: if stderr.is_empty() {
                        stdout
                    } else {
                        stderr
                    },
                }
            };

            return Err(error.into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.is_empty() {
            tracing::trace!(target: "git", "{prefix}{}", stdout.trim());
        }
        if !stderr.is_empty() {
            tracing::debug!(target: "git", "{prefix}{}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "git::perf",
                "{prefix}Git {} took {:.2}s",
                operation,
                elapsed.as_secs_f64()
            );
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(
                target: "git::perf",
                "{prefix}Git {} took {}ms",
                operation,
                elapsed.as_millis()
            );
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and return only stdout as a trimmed string.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command, discarding its output.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Output from a git command
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output from the git command
    pub stdout: String,
    /// Standard error output from the git command
    pub stderr: String,
}

// Convenience builders for the operations the checkout driver performs

impl GitCommand {
    /// Full clone of `url` into `target`.
    ///
    /// The whole history is fetched so abbreviated commits can be resolved.
    pub fn clone(url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new()
            .args(["clone", "--no-checkout", url])
            .arg(target.as_ref().display().to_string())
            .with_timeout(Some(GIT_CLONE_TIMEOUT));
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// Prune-and-fetch-all-tags update of an existing clone.
    pub fn fetch() -> Self {
        Self::new().args(["fetch", "--all", "--tags", "--prune", "--force"])
    }

    /// Force-checkout `branch`, resetting it to `remote_ref`.
    pub fn checkout_branch(branch: &str, remote_ref: &str) -> Self {
        Self::new().args(["checkout", "--force", "-B", branch, remote_ref])
    }

    /// Force-checkout a tag or commit as a detached HEAD.
    pub fn checkout_detached(rev: &str) -> Self {
        Self::new().args(["checkout", "--force", "--detach", rev])
    }

    /// Verify that a revision expression resolves.
    pub fn verify_ref(rev: &str) -> Self {
        Self::new().args(["rev-parse", "--verify", "--quiet", rev])
    }

    /// Hashes of every commit reachable from any reference, newest first.
    pub fn rev_list_all() -> Self {
        Self::new().args(["rev-list", "--all"])
    }

    /// Target of the remote's default-branch pointer.
    pub fn remote_head() -> Self {
        Self::new().args(["symbolic-ref", "--quiet", "refs/remotes/origin/HEAD"])
    }

    /// Ask the remote for its default branch and record it locally.
    pub fn set_remote_head() -> Self {
        Self::new().args(["remote", "set-head", "origin", "--auto"])
    }

    /// Most recently created tag.
    pub fn latest_tag() -> Self {
        Self::new().args([
            "for-each-ref",
            "--sort=-creatordate",
            "--count=1",
            "--format=%(refname:short)",
            "refs/tags",
        ])
    }

    /// Name of the currently checked out branch (empty when detached).
    pub fn current_branch() -> Self {
        Self::new().args(["branch", "--show-current"])
    }

    /// Hash of `HEAD`.
    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }
}
