//! Core types shared by every stage of the externals pipeline
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! - [`PackError`] - enumerated failure kinds of normalization, checkout and copying
//! - [`ErrorContext`] - user-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - convert any `anyhow::Error` for CLI display
//!
//! ## `file_error` - Filesystem Context
//!
//! - [`FileResultExt::with_file_context`] attaches operation, path and purpose to
//!   an IO failure at the call site
//! - [`FileOperationError::hint`] feeds the suggestion shown for IO failures
//!
//! # Examples
//!
//! ```rust
//! use addonpack::core::{PackError, user_friendly_error};
//!
//! fn resolve() -> anyhow::Result<String> {
//!     Err(PackError::InvalidCommit { reference: "abc".to_string() }.into())
//! }
//!
//! if let Err(e) = resolve() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.suggestion.is_some());
//! }
//! ```

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, PackError, user_friendly_error};
pub use file_error::{FileOperation, FileOperationError, FileResultExt};
