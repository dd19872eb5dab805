//! External dependency data model
//!
//! An external is a library vendored into the package from another
//! repository. Its declaration in the packaging metadata is either a bare URL
//! or a record:
//!
//! ```yaml
//! externals:
//!   Libs/LibStub: https://repos.wowace.com/wow/libstub/trunk
//!   Libs/AceGUI-3.0:
//!     url: https://github.com/owner/Ace3/AceGUI-3.0
//!     tag: latest
//!   Libs/Custom:
//!     url: https://example.org/custom.git
//!     branch: develop
//!     curse-slug: custom-lib
//! ```
//!
//! [`normalize`] turns each declaration into an [`ExternalDependencySpec`], a
//! checkout driver turns that into a [`CheckoutResult`].

pub mod normalize;

pub use normalize::{normalize, normalize_value};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Tag selector value requesting the most recent tag.
pub const LATEST_TAG: &str = "latest";

/// Version-control family hosting a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// git
    #[serde(rename = "git")]
    DistributedVcs,
    /// Subversion
    #[serde(rename = "svn")]
    CentralizedVcs,
    /// Mercurial (recognized, not supported)
    #[serde(rename = "hg")]
    LegacyVcs,
    /// Declared with a `type` that is none of the above
    #[serde(rename = "unknown")]
    Unrecognized,
}

impl Backend {
    /// Backend named by a declaration's `type` field.
    ///
    /// Returns `None` for an empty name, [`Backend::Unrecognized`] for any
    /// other unknown name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" => None,
            "git" => Some(Self::DistributedVcs),
            "svn" => Some(Self::CentralizedVcs),
            "hg" => Some(Self::LegacyVcs),
            _ => Some(Self::Unrecognized),
        }
    }

    /// Short name as used in declarations.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DistributedVcs => "git",
            Self::CentralizedVcs => "svn",
            Self::LegacyVcs => "hg",
            Self::Unrecognized => "unknown",
        }
    }

    /// Short name colored for terminal listings.
    #[must_use]
    pub fn colored_name(&self) -> String {
        match self {
            Self::DistributedVcs => self.as_str().green().to_string(),
            Self::CentralizedVcs => self.as_str().yellow().to_string(),
            Self::LegacyVcs => self.as_str().blue().to_string(),
            Self::Unrecognized => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which revision of a dependency to materialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CheckoutSelector {
    /// A named branch
    Branch(String),
    /// A named tag, or [`LATEST_TAG`]
    Tag(String),
    /// A full commit hash, abbreviated hash, or svn revision number
    Commit(String),
    /// The repository's default branch (git) or trunk (svn)
    Default,
}

impl CheckoutSelector {
    /// Literal selector value; empty for [`CheckoutSelector::Default`].
    ///
    /// Cache slots and staleness markers are keyed on this value.
    #[must_use]
    pub fn literal(&self) -> &str {
        match self {
            Self::Branch(v) | Self::Tag(v) | Self::Commit(v) => v,
            Self::Default => "",
        }
    }

    /// Kind of selector as used in declarations.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Branch(_) => "branch",
            Self::Tag(_) => "tag",
            Self::Commit(_) => "commit",
            Self::Default => "default",
        }
    }

    /// Whether this selector asks for the most recent tag.
    #[must_use]
    pub fn is_latest_tag(&self) -> bool {
        matches!(self, Self::Tag(tag) if tag == LATEST_TAG)
    }
}

impl fmt::Display for CheckoutSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            other => write!(f, "{} {}", other.kind(), other.literal()),
        }
    }
}

/// Structured form of a dependency declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    /// Explicit backend (`git`, `svn`, `hg`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Repository URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Tag to check out, or `latest`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Branch to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Commit (hash, abbreviated hash, or svn revision) to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Attribution slug used when the URL does not reveal one
    #[serde(rename = "curse-slug", default, skip_serializing_if = "Option::is_none")]
    pub curse_slug: Option<String>,
    /// Path inside the dependency's tree to vendor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A dependency declaration as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDeclaration {
    /// Bare URL
    Url(String),
    /// Record with explicit fields
    Record(DeclarationRecord),
}

impl From<&str> for RawDeclaration {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<DeclarationRecord> for RawDeclaration {
    fn from(record: DeclarationRecord) -> Self {
        Self::Record(record)
    }
}

/// Canonical description of one external dependency.
///
/// Immutable after normalization; a driver reports what it actually resolved
/// through [`CheckoutResult`] instead of mutating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDependencySpec {
    /// Destination relative to the package root
    pub dest_path: String,
    /// Declaration this spec was built from
    pub raw: RawDeclaration,
    /// Hosting backend
    pub backend: Backend,
    /// Repository root URL without in-repo path or mirror suffixes
    pub url: String,
    /// Requested revision
    pub selector: CheckoutSelector,
    /// Path inside the repository to vendor, if not the whole tree
    pub subpath: Option<String>,
    /// Project identifier used to credit embedded libraries
    pub attribution_slug: Option<String>,
    /// Cache directory holding this dependency's checkout
    pub cache_slot: PathBuf,
}

impl ExternalDependencySpec {
    /// Whether `subpath` is already part of the URL (path-scoped checkout).
    #[must_use]
    pub fn subpath_in_url(&self) -> bool {
        self.subpath.as_deref().is_some_and(|subpath| self.url.contains(subpath))
    }

    /// Directory the copier reads from once the slot is checked out.
    ///
    /// Nested one level deeper than the slot when the subpath is not part of
    /// the checked-out URL.
    #[must_use]
    pub fn checkout_path(&self) -> PathBuf {
        match &self.subpath {
            Some(subpath) if !self.subpath_in_url() => self.cache_slot.join(subpath),
            _ => self.cache_slot.clone(),
        }
    }
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutResult {
    /// Selector actually checked out (`latest` and `Default` resolved)
    pub resolved: CheckoutSelector,
    /// On-disk directory holding the dependency's contents
    pub path: PathBuf,
    /// Whether a fresh staleness marker made the network round-trip unnecessary
    pub from_cache: bool,
    /// Attribution slug, from the URL or discovered in the checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_slug: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_type_name() {
        assert_eq!(Backend::from_type_name("git"), Some(Backend::DistributedVcs));
        assert_eq!(Backend::from_type_name("SVN"), Some(Backend::CentralizedVcs));
        assert_eq!(Backend::from_type_name("hg"), Some(Backend::LegacyVcs));
        assert_eq!(Backend::from_type_name("cvs"), Some(Backend::Unrecognized));
        assert_eq!(Backend::from_type_name(" "), None);
    }

    #[test]
    fn test_selector_literal_and_display() {
        assert_eq!(CheckoutSelector::Default.literal(), "");
        assert_eq!(CheckoutSelector::Tag("v1".into()).literal(), "v1");
        assert_eq!(CheckoutSelector::Branch("main".into()).to_string(), "branch main");
        assert!(CheckoutSelector::Tag(LATEST_TAG.into()).is_latest_tag());
        assert!(!CheckoutSelector::Branch(LATEST_TAG.into()).is_latest_tag());
    }

    #[test]
    fn test_raw_declaration_yaml_shapes() {
        let url: RawDeclaration = serde_yaml::from_str("https://github.com/a/b").unwrap();
        assert_eq!(url, RawDeclaration::Url("https://github.com/a/b".into()));

        let record: RawDeclaration =
            serde_yaml::from_str("url: https://github.com/a/b\ncurse-slug: b-lib\ntag: v2").unwrap();
        match record {
            RawDeclaration::Record(r) => {
                assert_eq!(r.url.as_deref(), Some("https://github.com/a/b"));
                assert_eq!(r.curse_slug.as_deref(), Some("b-lib"));
                assert_eq!(r.tag.as_deref(), Some("v2"));
            }
            RawDeclaration::Url(_) => panic!("expected record"),
        }
    }

    #[test]
    fn test_checkout_path_nesting() {
        let mut spec = ExternalDependencySpec {
            dest_path: "Libs/Foo".into(),
            raw: RawDeclaration::from("https://example.org/repo"),
            backend: Backend::CentralizedVcs,
            url: "https://repos.wowace.com/wow/foo/trunk/Foo".into(),
            selector: CheckoutSelector::Default,
            subpath: Some("Foo".into()),
            attribution_slug: None,
            cache_slot: PathBuf::from("/cache/slot"),
        };
        assert_eq!(spec.checkout_path(), PathBuf::from("/cache/slot"));

        spec.url = "https://repos.wowace.com/wow/foo/trunk".into();
        assert_eq!(spec.checkout_path(), PathBuf::from("/cache/slot/Foo"));
    }
}
