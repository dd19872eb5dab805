//! Packaging metadata reader
//!
//! Reads `pkgmeta.yml` / `.pkgmeta`, the YAML file that declares a project's
//! externals, ignore rules and embedded libraries:
//!
//! ```yaml
//! package-as: MyAddon
//! externals:
//!   Libs/LibStub: https://repos.curseforge.com/wow/libstub/trunk
//!   Libs/LibFoo:
//!     url: https://github.com/owner/LibFoo
//!     tag: latest
//! ignore:
//!   - README.md
//!   - tests/*
//! embedded-libraries:
//!   - libstub
//! ```
//!
//! Only the fields the externals pipeline uses are interpreted; the rest are
//! kept so callers further down the packaging pipeline can read them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cache::CacheStore;
use crate::core::{FileOperation, FileResultExt, PackError};
use crate::external::{ExternalDependencySpec, normalize_value};

/// File names searched for, in order.
pub const PKGMETA_FILE_NAMES: &[&str] = &["pkgmeta.yml", ".pkgmeta"];

/// Manually maintained changelog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManualChangelog {
    /// Changelog file name
    #[serde(default)]
    pub filename: String,
    /// Markup of the changelog (`markdown`, `bbcode`, `text`)
    #[serde(default)]
    pub markup_type: Option<String>,
}

/// Parsed packaging metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PkgMeta {
    /// Name of the packaged directory
    pub package_as: Option<String>,
    /// Destination path to dependency declaration, in file order
    pub externals: serde_yaml::Mapping,
    /// Folders moved after packaging
    pub move_folders: BTreeMap<String, String>,
    /// Glob patterns excluded from the package
    pub ignore: Vec<String>,
    /// Also build a package without externals
    pub enable_nolib_creation: bool,
    /// Required dependency slugs
    pub required_dependencies: Vec<String>,
    /// Optional dependency slugs
    pub optional_dependencies: Vec<String>,
    /// Manually credited embedded library slugs
    pub embedded_libraries: Vec<String>,
    /// Tool slugs
    pub tools_used: Vec<String>,
    /// Manual changelog settings
    pub manual_changelog: Option<ManualChangelog>,
    /// Title used in generated changelogs
    pub changelog_title: Option<String>,
}

impl PkgMeta {
    /// Parse metadata from YAML text. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::YamlError`] on malformed YAML.
    pub fn parse(content: &str) -> Result<Self, PackError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and parse the metadata file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_file_context(
            FileOperation::Read,
            path,
            "reading package metadata",
            "pkgmeta::PkgMeta::load",
        )?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Metadata file in `dir`: `pkgmeta.yml` first, then `.pkgmeta`.
    #[must_use]
    pub fn find(dir: &Path) -> Option<PathBuf> {
        PKGMETA_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
    }

    /// Load the metadata file of `dir`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata file exists but cannot be read or parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        Self::find(dir).map(|path| Self::load(&path)).transpose()
    }

    /// Name of the packaged directory, defaulting to the project directory's name.
    #[must_use]
    pub fn package_name(&self, project_dir: &Path) -> String {
        self.package_as.clone().filter(|name| !name.is_empty()).unwrap_or_else(|| {
            project_dir
                .file_name()
                .map_or_else(|| "package".to_string(), |name| name.to_string_lossy().into_owned())
        })
    }

    /// Normalize every declared external, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::InvalidDeclaration`] for the first declaration that
    /// has a non-string destination or cannot be normalized.
    pub fn externals(&self, cache: &CacheStore) -> Result<Vec<ExternalDependencySpec>, PackError> {
        self.externals
            .iter()
            .map(|(dest, declaration)| {
                let dest = dest.as_str().ok_or_else(|| PackError::InvalidDeclaration {
                    dest: format!("{dest:?}"),
                    reason: "destination path must be a string".to_string(),
                })?;
                normalize_value(dest.trim_matches('/'), declaration, cache)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{Backend, CheckoutSelector};
    use tempfile::TempDir;

    const PKGMETA: &str = r"
package-as: MyAddon
externals:
  Libs/LibStub: https://repos.curseforge.com/wow/libstub/trunk
  Libs/LibFoo:
    url: https://github.com/owner/LibFoo
    tag: v1.0
ignore:
  - README.md
  - tests/*
embedded-libraries:
  - libstub
manual-changelog:
  filename: CHANGELOG.md
  markup-type: markdown
";

    #[test]
    fn test_parse_fields() {
        let meta = PkgMeta::parse(PKGMETA).unwrap();
        assert_eq!(meta.package_as.as_deref(), Some("MyAddon"));
        assert_eq!(meta.ignore, vec!["README.md", "tests/*"]);
        assert_eq!(meta.embedded_libraries, vec!["libstub"]);
        assert_eq!(meta.manual_changelog.unwrap().markup_type.as_deref(), Some("markdown"));
        assert!(!meta.enable_nolib_creation);
    }

    #[test]
    fn test_externals_keep_file_order() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::with_root(temp.path());
        let specs = PkgMeta::parse(PKGMETA).unwrap().externals(&cache).unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].dest_path, "Libs/LibStub");
        assert_eq!(specs[0].backend, Backend::CentralizedVcs);
        assert_eq!(specs[1].dest_path, "Libs/LibFoo");
        assert_eq!(specs[1].selector, CheckoutSelector::Tag("v1.0".to_string()));
    }

    #[test]
    fn test_invalid_external_shape() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::with_root(temp.path());
        let meta = PkgMeta::parse("externals:\n  Libs/Bad:\n    - not\n    - a record\n").unwrap();

        assert!(matches!(meta.externals(&cache), Err(PackError::InvalidDeclaration { .. })));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(PkgMeta::parse("  \n").unwrap(), PkgMeta::default());
    }

    #[test]
    fn test_find_prefers_pkgmeta_yml() {
        let temp = TempDir::new().unwrap();
        assert!(PkgMeta::find(temp.path()).is_none());
        assert!(PkgMeta::load_from_dir(temp.path()).unwrap().is_none());

        std::fs::write(temp.path().join(".pkgmeta"), "package-as: Dot\n").unwrap();
        assert_eq!(PkgMeta::find(temp.path()).unwrap(), temp.path().join(".pkgmeta"));

        std::fs::write(temp.path().join("pkgmeta.yml"), "package-as: Yml\n").unwrap();
        let meta = PkgMeta::load_from_dir(temp.path()).unwrap().unwrap();
        assert_eq!(meta.package_as.as_deref(), Some("Yml"));
    }

    #[test]
    fn test_package_name_fallback() {
        let meta = PkgMeta::default();
        assert_eq!(meta.package_name(Path::new("/work/CoolAddon")), "CoolAddon");
    }
}
