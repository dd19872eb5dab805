//! Error handling for addonpack
//!
//! This module provides the error taxonomy of the externals pipeline and the
//! user-friendly reporting used by the CLI. The error system is built around two
//! principles:
//! 1. **Strongly-typed errors** so callers can react to specific failures
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Declaration errors**: [`PackError::InvalidDeclaration`] - malformed or
//!   URL-less dependency declarations, always fatal for that dependency
//! - **Environment errors**: [`PackError::SvnNotFound`], [`PackError::GitNotFound`] -
//!   required tooling missing, detected when a driver is constructed
//! - **Subprocess errors**: [`PackError::GitCommandError`], [`PackError::GitCloneFailed`],
//!   [`PackError::SvnCommandError`] - the version-control binary reported a failure
//! - **Resolution errors**: [`PackError::ReferenceNotFound`], [`PackError::CommitNotFound`],
//!   [`PackError::NoDefaultBranch`], [`PackError::LatestTagNotFound`] - the requested
//!   revision cannot be resolved
//!
//! Staleness marker corruption is deliberately absent: an unreadable marker is a
//! cache miss, never an error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use addonpack::core::{PackError, user_friendly_error};
//!
//! let error = anyhow::Error::from(PackError::SvnNotFound);
//! let context = user_friendly_error(error);
//! context.display(); // Shows the error with an installation hint
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use super::file_error::FileOperationError;

/// The main error type for addonpack operations
///
/// Each variant carries enough context (URL, reference, destination) to identify
/// the dependency that failed when errors from concurrent fetches are aggregated.
#[derive(Error, Debug)]
pub enum PackError {
    /// A dependency declaration could not be turned into a checkout plan
    #[error("Invalid external declaration for '{dest}': {reason}")]
    InvalidDeclaration {
        /// Destination path the declaration was attached to
        dest: String,
        /// Why the declaration was rejected
        reason: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// Subversion executable not found in PATH
    #[error("svn is not installed or not found in PATH")]
    SvnNotFound,

    /// Git command returned a non-zero exit status
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "fetch", "checkout")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Cloning a repository into the cache failed
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL
        url: String,
        /// Error output from git
        reason: String,
    },

    /// Subversion command returned a non-zero exit status
    #[error("svn operation failed: {operation}")]
    SvnCommandError {
        /// The svn operation that failed (e.g., "checkout", "update", "log")
        operation: String,
        /// Combined error output of the svn command
        stderr: String,
    },

    /// A branch or tag does not exist in the repository
    #[error("Reference '{reference}' not found in {url}")]
    ReferenceNotFound {
        /// The repository URL
        url: String,
        /// Branch or tag name
        reference: String,
    },

    /// No commit in the history starts with the abbreviated hash
    #[error("No commit matching abbreviated hash '{prefix}' in {url}")]
    CommitNotFound {
        /// The repository URL
        url: String,
        /// The abbreviated commit hash
        prefix: String,
    },

    /// Commit selector is neither a full hash nor a usable abbreviation
    #[error("Invalid commit hash or abbreviated hash: {reference}")]
    InvalidCommit {
        /// The rejected commit selector
        reference: String,
    },

    /// The remote does not advertise an unambiguous default branch
    #[error("Failed to determine the default branch of {url}")]
    NoDefaultBranch {
        /// The repository URL
        url: String,
    },

    /// Latest-tag discovery found no tags
    #[error("Failed to determine the latest tag of {url}")]
    LatestTagNotFound {
        /// The repository (tags) URL
        url: String,
    },

    /// The checkout that should be copied into the package is missing
    #[error("Cache path does not exist for '{dest}': {path}")]
    CacheEntryMissing {
        /// Destination path inside the package
        dest: String,
        /// Expected on-disk checkout path
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for PackError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidDeclaration {
                dest,
                reason,
            } => Self::InvalidDeclaration {
                dest: dest.clone(),
                reason: reason.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::SvnNotFound => Self::SvnNotFound,
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitCloneFailed {
                url,
                reason,
            } => Self::GitCloneFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::SvnCommandError {
                operation,
                stderr,
            } => Self::SvnCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::ReferenceNotFound {
                url,
                reference,
            } => Self::ReferenceNotFound {
                url: url.clone(),
                reference: reference.clone(),
            },
            Self::CommitNotFound {
                url,
                prefix,
            } => Self::CommitNotFound {
                url: url.clone(),
                prefix: prefix.clone(),
            },
            Self::InvalidCommit {
                reference,
            } => Self::InvalidCommit {
                reference: reference.clone(),
            },
            Self::NoDefaultBranch {
                url,
            } => Self::NoDefaultBranch {
                url: url.clone(),
            },
            Self::LatestTagNotFound {
                url,
            } => Self::LatestTagNotFound {
                url: url.clone(),
            },
            Self::CacheEntryMissing {
                dest,
                path,
            } => Self::CacheEntryMissing {
                dest: dest.clone(),
                path: path.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::YamlError(e) => Self::Other {
                message: format!("YAML parsing error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`PackError`] and adds an optional suggestion and
/// details. When displayed the error is printed in red, details in yellow and the
/// suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PackError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: PackError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Errors anywhere in the chain that are [`PackError`]s get tailored suggestions;
/// other errors are reported with their full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(pack_error) = error.chain().find_map(|e| e.downcast_ref::<PackError>()) {
        let mut context = create_error_context(pack_error.clone());
        // Keep the dependency-identifying outer context visible.
        let outer = error.to_string();
        if outer != pack_error.to_string() {
            context.details = Some(match context.details.take() {
                Some(details) => format!("{outer}\n{details}"),
                None => outer,
            });
        }
        return context;
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    let context = ErrorContext::new(PackError::Other {
        message,
    });
    match error.chain().find_map(|e| e.downcast_ref::<FileOperationError>()).and_then(FileOperationError::hint) {
        Some(hint) => context.with_suggestion(hint),
        None => context,
    }
}

fn create_error_context(error: PackError) -> ErrorContext {
    match &error {
        PackError::SvnNotFound => ErrorContext::new(error)
            .with_suggestion("Install Subversion (e.g., 'brew install subversion', 'apt install subversion') or remove svn externals from your metadata file")
            .with_details("Externals hosted in Subversion repositories are checked out with the system svn binary"),

        PackError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ or your package manager (e.g., 'brew install git', 'apt install git')")
            .with_details("Externals hosted in git repositories are fetched with the system git binary"),

        PackError::InvalidDeclaration { .. } => ErrorContext::new(error)
            .with_suggestion("Every external needs a URL, either as a plain string or as the 'url' field of a mapping")
            .with_details("Externals may be declared as 'Libs/Foo: https://...' or with 'url', 'tag', 'branch', 'commit', 'type' and 'curse-slug' fields"),

        PackError::GitCloneFailed { url, .. } => {
            let suggestion = format!(
                "Verify the repository URL is correct: {url}. Check your internet connection and repository access"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Clone operations can fail due to invalid URLs, network issues, or access restrictions")
        }

        PackError::GitCommandError { stderr, .. } | PackError::SvnCommandError { stderr, .. } => {
            let details = stderr.trim().to_string();
            let context = ErrorContext::new(error)
                .with_suggestion("Check your network connection and repository access, or retry with --force-externals to rebuild the cache entry");
            if details.is_empty() {
                context
            } else {
                context.with_details(details)
            }
        }

        PackError::ReferenceNotFound { .. } | PackError::CommitNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the branch, tag or commit exists in the repository ('git ls-remote <url>' lists references)"),

        PackError::InvalidCommit { .. } => ErrorContext::new(error)
            .with_suggestion("Use a full 40-character commit hash or an abbreviation of at least 7 characters"),

        PackError::NoDefaultBranch { .. } => ErrorContext::new(error)
            .with_suggestion("Declare an explicit 'branch' or 'tag' for this external"),

        PackError::LatestTagNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("The repository has no tags yet; declare a 'branch' or remove the 'tag: latest' setting"),

        PackError::CacheEntryMissing { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'addonpack cache clear' and fetch again"),

        PackError::YamlError(_) => ErrorContext::new(error)
            .with_suggestion("Check the YAML syntax of your .pkgmeta / pkgmeta.yml file"),

        PackError::TomlError(_) => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax of ~/.addonpack/config.toml"),

        _ => ErrorContext::new(error),
    }
}
