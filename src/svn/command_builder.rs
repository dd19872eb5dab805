//! Builder for svn invocations
//!
//! Mirrors [`crate::git::GitCommand`]: every svn call made by the checkout
//! driver runs non-interactively, with a timeout, logs under the `svn` /
//! `svn::perf` targets and fails with [`PackError::SvnCommandError`].

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::SVN_CHECKOUT_TIMEOUT;
use crate::core::PackError;
use crate::utils::platform::get_svn_command;

/// Builder for a single svn invocation.
pub struct SvnCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl Default for SvnCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            timeout_duration: Some(SVN_CHECKOUT_TIMEOUT),
            context: None,
        }
    }
}

impl SvnCommand {
    /// Creates a new svn command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory of the svn process.
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
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn prefix(&self) -> String {
        self.context.as_ref().map(|ctx| format!("({ctx}) ")).unwrap_or_default()
    }

    /// Execute the command and return its stdout.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::SvnCommandError`] for a non-zero exit or a timeout,
    /// and an IO error if svn cannot be spawned.
    pub async fn execute(self) -> Result<String> {
        let start = std::time::Instant::now();
        let svn_command = get_svn_command();
        let prefix = self.prefix();

        let mut full_args = vec!["--non-interactive".to_string()];
        full_args.extend(self.args.iter().cloned());

        let mut cmd = Command::new(svn_command);
        cmd.args(&full_args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        tracing::debug!(target: "svn", "{prefix}Executing command: {} {}", svn_command, full_args.join(" "));

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let operation = self.args.first().cloned().unwrap_or_else(|| "unknown".to_string());
        let output_future = cmd.output();

        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => {
                    result.with_context(|| format!("Failed to execute svn {}", full_args.join(" ")))?
                }
                Err(_) => {
                    tracing::warn!(
                        target: "svn",
                        "{prefix}Command timed out after {} seconds: svn {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(PackError::SvnCommandError {
                        operation,
                        stderr: format!("svn command timed out after {} seconds", duration.as_secs()),
                    }
                    .into());
                }
            },
            None => output_future
                .await
                .with_context(|| format!("Failed to execute svn {}", full_args.join(" ")))?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "svn",
                "{prefix}Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "svn", "{prefix}Error: {}", stderr.trim());
            }

            return Err(PackError::SvnCommandError {
                operation,
                stderr: if stderr.is_empty() {
                    stdout
                } else {
                    stderr
                },
            }
            .into());
        }

        if !stdout.is_empty() {
            tracing::trace!(target: "svn", "{prefix}{}", stdout.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "svn::perf",
                "{prefix}svn {} took {:.2}s",
                operation,
                elapsed.as_secs_f64()
            );
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "svn::perf", "{prefix}svn {} took {}ms", operation, elapsed.as_millis());
        }

        Ok(stdout)
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

impl SvnCommand {
    /// Check out `url` into `target`, optionally pinned to `revision`.
    pub fn checkout(url: &str, target: impl AsRef<Path>, revision: Option<&str>) -> Self {
        let mut cmd = Self::new().arg("checkout");
        if let Some(rev) = revision {
            cmd = cmd.args(["-r", rev]);
        }
        cmd.arg(url).arg(target.as_ref().display().to_string())
    }

    /// Update the working copy in the current directory to `url`.
    ///
    /// Equivalent to `svn update` when `url` is already the working copy's URL,
    /// and moves it when a newer `latest` tag was discovered.
    pub fn switch(url: &str, revision: Option<&str>) -> Self {
        let mut cmd = Self::new().arg("switch");
        if let Some(rev) = revision {
            cmd = cmd.args(["-r", rev]);
        }
        cmd.arg(url)
    }

    /// Most recent change under `url`, with changed paths.
    pub fn log_latest(url: &str) -> Self {
        Self::new().args(["log", "--verbose", "--limit", "1", url])
    }
}
