//! Platform helpers for locating the version-control binaries.

/// Checks whether a command is available on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Returns `true` when compiled for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Name of the git executable for the current platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}

/// Name of the svn executable for the current platform.
#[must_use]
pub const fn get_svn_command() -> &'static str {
    if is_windows() {
        "svn.exe"
    } else {
        "svn"
    }
}
