//! Subversion operations wrapper
//!
//! Thin async layer over the system `svn` binary used by the centralized
//! checkout driver. Repositories follow the conventional layout:
//!
//! ```text
//! <root>/trunk
//! <root>/branches/<name>
//! <root>/tags/<name>
//! ```

pub mod command_builder;

use anyhow::Result;
use regex::Regex;
use std::path::Path;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use crate::constants::{STARTING_BACKOFF_DELAY_MS, SVN_MAX_ATTEMPTS};
use crate::core::PackError;
pub use command_builder::SvnCommand;

/// Name used for the trunk of a repository.
pub const TRUNK: &str = "trunk";

/// Repository root: everything before the `/trunk` component.
#[must_use]
pub fn repository_root(url: &str) -> &str {
    url.split_once("/trunk").map_or(url.trim_end_matches('/'), |(root, _)| root)
}

/// URL of the `tags` directory of the repository `url` belongs to.
#[must_use]
pub fn tags_url(url: &str) -> String {
    format!("{}/tags", repository_root(url))
}

/// URL of branch `name`.
#[must_use]
pub fn branch_url(url: &str, name: &str) -> String {
    format!("{}/branches/{name}", repository_root(url))
}

/// URL of tag `name`, scoped to `subpath` when given.
#[must_use]
pub fn tag_url(url: &str, name: &str, subpath: Option<&str>) -> String {
    match subpath {
        Some(path) => format!("{}/{name}/{path}", tags_url(url)),
        None => format!("{}/{name}", tags_url(url)),
    }
}

/// Tag created by the change shown in `svn log --verbose` output.
#[must_use]
pub fn parse_latest_tag(log: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^\s*A /tags/([^\s/]+)").ok()?;
    re.captures(log).map(|caps| caps[1].to_string())
}

/// Ask the repository for its most recently created tag.
///
/// The log query is attempted up to five times with a short fixed delay.
///
/// # Errors
///
/// Returns [`PackError::SvnCommandError`] if every attempt fails.
pub async fn latest_tag(url: &str, context: &str) -> Result<Option<String>> {
    let tags = tags_url(url);
    let strategy = FixedInterval::from_millis(STARTING_BACKOFF_DELAY_MS)
        .take(SVN_MAX_ATTEMPTS.saturating_sub(1) as usize);

    let log = RetryIf::spawn(
        strategy,
        || SvnCommand::log_latest(&tags).with_context(context).execute(),
        |e: &anyhow::Error| {
            let transient = matches!(e.downcast_ref::<PackError>(), Some(PackError::SvnCommandError { .. }));
            if transient {
                tracing::debug!(target: "svn", "({context}) Failed to get latest tag: {e:#}, retrying");
            }
            transient
        },
    )
    .await?;

    Ok(parse_latest_tag(&log))
}

/// Whether `path` is an svn working copy.
#[must_use]
pub fn is_working_copy(path: &Path) -> bool {
    path.join(".svn").is_dir()
}

/// Checks if svn is on `PATH`.
#[must_use]
pub fn is_svn_installed() -> bool {
    crate::utils::platform::command_exists(crate::utils::platform::get_svn_command())
}

/// Fails with [`PackError::SvnNotFound`] if svn is unavailable.
///
/// # Errors
///
/// Returns [`PackError::SvnNotFound`] when [`is_svn_installed`] is false.
pub fn ensure_svn_available() -> Result<(), PackError> {
    if !is_svn_installed() {
        return Err(PackError::SvnNotFound);
    }
    Ok(())
}

/// Combined output of a failed svn command, for transient-failure classification.
#[must_use]
pub fn failure_output(error: &anyhow::Error) -> String {
    match error.downcast_ref::<PackError>() {
        Some(PackError::SvnCommandError {
            stderr,
            ..
        }) => stderr.clone(),
        _ => format!("{error:#}"),
    }
}
