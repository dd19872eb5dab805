//! Filesystem errors that remember what they were doing
//!
//! Cache slots, markers and package directories are all touched from many
//! concurrent tasks. [`FileResultExt::with_file_context`] tags an IO failure
//! with the operation, the path and the purpose at the call site, and
//! [`FileOperationError::hint`] turns the IO error kind into advice for the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Remove,
    Copy,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Remove => "remove",
            Self::Copy => "copy",
            Self::Metadata => "stat",
            Self::CreateDir => "create directory",
        })
    }
}

/// IO failure tagged with its operation, path and purpose.
#[derive(Error, Debug)]
#[error("Could not {operation} '{}' while {purpose} [{caller}]", path.display())]
pub struct FileOperationError {
    pub operation: FileOperation,
    pub path: PathBuf,
    /// What the caller was trying to achieve, e.g. "copying external into package"
    pub purpose: String,
    /// Module that issued the operation
    pub caller: String,
    #[source]
    pub source: std::io::Error,
}

impl FileOperationError {
    /// Advice matching the IO error kind, if there is any to give.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self.source.kind() {
            std::io::ErrorKind::PermissionDenied => Some(format!(
                "Check the permissions of {}; the cache root can be moved with ADDONPACK_CACHE_DIR",
                self.path.display()
            )),
            std::io::ErrorKind::NotFound if self.operation == FileOperation::Copy => Some(
                "The cached checkout changed while copying; retry with --force-externals".to_string(),
            ),
            std::io::ErrorKind::InvalidData => Some(format!("{} is not valid UTF-8", self.path.display())),
            _ => None,
        }
    }
}

/// Attach [`FileOperationError`] context to an IO result.
pub trait FileResultExt<T> {
    /// Tag the error with `operation` on `path`, done for `purpose` by `caller`.
    fn with_file_context(
        self,
        operation: FileOperation,
        path: impl Into<PathBuf>,
        purpose: impl Into<String>,
        caller: impl Into<String>,
    ) -> Result<T, FileOperationError>;
}

impl<T> FileResultExt<T> for Result<T, std::io::Error> {
    fn with_file_context(
        self,
        operation: FileOperation,
        path: impl Into<PathBuf>,
        purpose: impl Into<String>,
        caller: impl Into<String>,
    ) -> Result<T, FileOperationError> {
        self.map_err(|source| FileOperationError {
            operation,
            path: path.into(),
            purpose: purpose.into(),
            caller: caller.into(),
            source,
        })
    }
}
