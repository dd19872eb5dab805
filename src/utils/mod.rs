//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - directory creation, atomic writes, removal and copying
//! - [`platform`] - locating the git and svn executables
//! - [`backoff`] - exponential backoff between retries

pub mod backoff;
pub mod fs;
pub mod platform;

pub use fs::{atomic_write, ensure_dir, remove_dir_all};
pub use platform::command_exists;
