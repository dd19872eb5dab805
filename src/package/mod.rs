//! Cache-to-package copier
//!
//! Copies a checked-out dependency from its cache slot into the package
//! directory. The destination is cleared first so files removed upstream do
//! not linger. A dependency may carry its own packaging metadata; its
//! `ignore` list is honored so vendored trees do not pick up the
//! dependency's own build artifacts.
//!
//! Hidden entries (names starting with `.`) are never copied, which also
//! keeps VCS metadata and staleness markers out of the package.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::{FileOperation, FileResultExt, PackError};
use crate::external::{CheckoutResult, ExternalDependencySpec};
use crate::pkgmeta::PkgMeta;
use crate::utils::fs::{copy_file, ensure_dir, recreate_dir};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

#[derive(Debug, Clone)]
struct IgnorePattern {
    /// Pattern as written, applied to files
    file: Pattern,
    /// Pattern with a trailing `/*` removed, applied to directories
    dir: Pattern,
}

impl IgnoreRules {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first pattern that is not a valid glob.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|raw| {
                let raw = raw.as_ref().trim();
                let dir_raw = raw.strip_suffix("/*").unwrap_or(raw);
                let compile =
                    |p: &str| Pattern::new(p).with_context(|| format!("Invalid ignore pattern '{raw}'"));
                Ok(IgnorePattern {
                    file: compile(raw)?,
                    dir: compile(dir_raw)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
        })
    }

    /// Whether no patterns are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether an entry is ignored, matching against both its path relative
    /// to the copy root (with `/` separators) and its bare name.
    #[must_use]
    pub fn is_ignored(&self, relative: &str, name: &str, is_dir: bool) -> bool {
        self.patterns.iter().any(|pattern| {
            let pattern = if is_dir { &pattern.dir } else { &pattern.file };
            pattern.matches_with(relative, MATCH_OPTIONS) || pattern.matches_with(name, MATCH_OPTIONS)
        })
    }
}

/// Ignore rules declared by the metadata file inside `dir`, if any.
///
/// # Errors
///
/// Returns an error if the metadata file exists but is invalid.
pub fn nested_ignore_rules(dir: &Path) -> Result<IgnoreRules> {
    match PkgMeta::load_from_dir(dir)? {
        Some(meta) => IgnoreRules::new(&meta.ignore),
        None => {
            tracing::debug!("No package metadata found in {}", dir.display());
            Ok(IgnoreRules::default())
        }
    }
}

/// Copy a checked-out dependency into `package_dir/<dest_path>`.
///
/// Returns the destination directory.
///
/// # Errors
///
/// Returns [`PackError::CacheEntryMissing`] if the checkout directory does not
/// exist, or an IO error if copying fails.
pub fn copy_external(
    spec: &ExternalDependencySpec,
    result: &CheckoutResult,
    package_dir: &Path,
) -> Result<PathBuf> {
    let dest = package_dir.join(&spec.dest_path);
    recreate_dir(&dest)?;

    if !result.path.is_dir() {
        return Err(PackError::CacheEntryMissing {
            dest: spec.dest_path.clone(),
            path: result.path.display().to_string(),
        }
        .into());
    }

    let ignores = nested_ignore_rules(&result.path)?;
    let copied = copy_tree(&result.path, &dest, &ignores)?;
    tracing::debug!(
        "({}) Copied {copied} files from {} to {}",
        spec.dest_path,
        result.path.display(),
        dest.display()
    );
    Ok(dest)
}

/// Recursively copy `src` into `dst`, skipping hidden and ignored entries.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns an error if the walk or a file copy fails.
pub fn copy_tree(src: &Path, dst: &Path, ignores: &IgnoreRules) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(src).min_depth(1).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            tracing::trace!("Ignoring hidden entry {}", entry.path().display());
            return false;
        }
        let relative = relative_path(src, entry.path());
        let ignored = ignores.is_ignored(&relative, &name, entry.file_type().is_dir());
        if ignored {
            tracing::trace!("Ignoring {}", entry.path().display());
        }
        !ignored
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry.path().strip_prefix(src).with_context(|| {
            format!("{} is not inside {}", entry.path().display(), src.display())
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target)?;
            copied += 1;
        } else if entry.file_type().is_symlink() {
            let resolved = std::fs::metadata(entry.path()).with_file_context(
                FileOperation::Metadata,
                entry.path(),
                "resolving symlink while copying external",
                "package::copy_tree",
            )?;
            if resolved.is_file() {
                copy_file(entry.path(), &target)?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
