//! Dependency declaration normalizer
//!
//! Turns a raw declaration into an [`ExternalDependencySpec`]:
//!
//! 1. Backend detection from a table of known hosts (when no `type` is given),
//!    with the `svn:` scheme as a fallback signal.
//! 2. Per-host canonicalization of mirror URLs, e.g.
//!    `git://git.wowace.com/wow/ace3/mainline.git` becomes
//!    `https://repos.wowace.com/wow/ace3`.
//! 3. Marketplace URLs (`https://repos.curseforge.com/wow/<slug>/...`) yield the
//!    attribution slug, and their `trunk/<path>` or `tags/<tag>` layout picks
//!    the svn backend, the in-repo subpath or the tag.
//! 4. git URLs on a generic forge with more than `owner/repo` segments are
//!    split into repository root and in-repo subpath.
//! 5. The cache slot is derived from the canonical URL and selector literal.
//!
//! Normalizing an already canonical URL is a no-op, so the same dependency
//! always lands in the same cache slot however it was written.

use super::{
    Backend, CheckoutSelector, DeclarationRecord, ExternalDependencySpec, RawDeclaration,
};
use crate::cache::CacheStore;
use crate::core::PackError;

const PROTOCOL_SEPARATOR: &str = "://";

/// Known mirror hosts and the backend they serve. Checked in order.
const HOST_PATTERNS: &[(&str, Backend)] = &[
    ("git.curseforge.com", Backend::DistributedVcs),
    ("git.wowace.com", Backend::DistributedVcs),
    ("svn.curseforge.com", Backend::CentralizedVcs),
    ("svn.wowace.com", Backend::CentralizedVcs),
    ("hg.curseforge.com", Backend::LegacyVcs),
    ("hg.wowace.com", Backend::LegacyVcs),
];

/// URL prefixes of the addon marketplace repositories.
const MARKETPLACE_PREFIXES: &[&str] =
    &["https://repos.curseforge.com/wow/", "https://repos.wowace.com/wow/"];

/// Forges whose URLs are `host/owner/repo[/path/in/repo]`.
const GENERIC_FORGES: &[&str] = &["github.com", "bitbucket.org"];

/// Normalize a declaration parsed from YAML.
///
/// Accepts a string (bare URL) or a mapping (record); anything else is an
/// [`PackError::InvalidDeclaration`].
///
/// # Errors
///
/// Returns an error if the value has neither shape or if [`normalize`] rejects it.
pub fn normalize_value(
    dest_path: &str,
    value: &serde_yaml::Value,
    cache: &CacheStore,
) -> Result<ExternalDependencySpec, PackError> {
    let raw = match value {
        serde_yaml::Value::String(url) => RawDeclaration::Url(url.clone()),
        serde_yaml::Value::Mapping(_) => {
            let record: DeclarationRecord =
                serde_yaml::from_value(value.clone()).map_err(|e| invalid(dest_path, e))?;
            RawDeclaration::Record(record)
        }
        _ => {
            return Err(invalid(dest_path, "expected a URL string or a mapping with a 'url' field"));
        }
    };

    normalize(dest_path, raw, cache)
}

/// Normalize one declaration into a canonical checkout plan.
///
/// The canonical `url` of a forge declaration such as
/// `https://github.com/owner/repo/sub` no longer carries `sub`; the subpath
/// lives only in the returned spec. Normalizing that `url` again yields the
/// repository root, so keep the original declaration when the subpath matters.
///
/// # Errors
///
/// Returns [`PackError::InvalidDeclaration`] if no URL is present.
pub fn normalize(
    dest_path: &str,
    raw: RawDeclaration,
    cache: &CacheStore,
) -> Result<ExternalDependencySpec, PackError> {
    let record = match &raw {
        RawDeclaration::Url(url) => DeclarationRecord {
            url: Some(url.clone()),
            ..DeclarationRecord::default()
        },
        RawDeclaration::Record(record) => record.clone(),
    };

    let mut url = non_empty(record.url.as_deref())
        .ok_or_else(|| invalid(dest_path, "URL is required"))?
        .to_string();

    let mut backend = record.kind.as_deref().and_then(Backend::from_type_name);
    let mut selector = selector_from_record(&record);
    let mut subpath = None;

    if let Some(host_backend) = detect_host(&url) {
        url = canonicalize_mirror_url(&url, host_backend);
        backend.get_or_insert(host_backend);
    }

    if backend.is_none() && url.starts_with("svn:") {
        backend = Some(Backend::CentralizedVcs);
    }

    let marketplace = parse_marketplace_url(&url);
    if let Some(layout) = &marketplace {
        match &layout.kind {
            MarketplaceLayout::Trunk {
                subpath: trunk_path,
            } => {
                backend = Some(Backend::CentralizedVcs);
                subpath = trunk_path.clone();
            }
            MarketplaceLayout::Tag {
                tag,
                trunk_url,
            } => {
                backend = Some(Backend::CentralizedVcs);
                selector = CheckoutSelector::Tag(tag.clone());
                url = trunk_url.clone();
            }
            MarketplaceLayout::Root => {}
        }
    }

    let backend = backend.unwrap_or(Backend::DistributedVcs);

    if backend == Backend::DistributedVcs && marketplace.is_none() {
        if let Some((root, forge_path)) = split_forge_url(&url) {
            url = root;
            subpath = Some(forge_path);
        }
    }

    if subpath.is_none() {
        subpath = non_empty(record.path.as_deref())
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
    }

    let attribution_slug = marketplace
        .map(|layout| layout.slug)
        .or_else(|| non_empty(record.curse_slug.as_deref()).map(str::to_string));

    // svn tags check out the subpath itself, so each subpath needs its own working copy
    let cache_slot = match (&backend, &selector, &subpath) {
        (Backend::CentralizedVcs, CheckoutSelector::Tag(_), Some(path)) => {
            cache.slot_path(&format!("{url}/{path}"), selector.literal())
        }
        _ => cache.slot_path(&url, selector.literal()),
    };

    Ok(ExternalDependencySpec {
        dest_path: dest_path.to_string(),
        raw,
        backend,
        url,
        selector,
        subpath,
        attribution_slug,
        cache_slot,
    })
}

/// Tag wins over branch, branch over commit; none of them means `Default`.
fn selector_from_record(record: &DeclarationRecord) -> CheckoutSelector {
    if let Some(tag) = non_empty(record.tag.as_deref()) {
        CheckoutSelector::Tag(tag.to_string())
    } else if let Some(branch) = non_empty(record.branch.as_deref()) {
        CheckoutSelector::Branch(branch.to_string())
    } else if let Some(commit) = non_empty(record.commit.as_deref()) {
        CheckoutSelector::Commit(commit.to_string())
    } else {
        CheckoutSelector::Default
    }
}

fn detect_host(url: &str) -> Option<Backend> {
    HOST_PATTERNS.iter().find(|(host, _)| url.contains(host)).map(|(_, backend)| *backend)
}

/// Rewrite a mirror host URL to the canonical `https://repos.*` form.
fn canonicalize_mirror_url(url: &str, backend: Backend) -> String {
    let (stripped, host_prefix) = match backend {
        Backend::DistributedVcs => (url.strip_suffix("/mainline.git").unwrap_or(url).to_string(), "git"),
        Backend::CentralizedVcs => (url.replacen("/mainline", "", 1), "svn"),
        Backend::LegacyVcs => (url.strip_suffix("/mainline").unwrap_or(url).to_string(), "hg"),
        Backend::Unrecognized => return url.to_string(),
    };

    let without_scheme = strip_scheme(&stripped);
    without_scheme.replacen(host_prefix, "https://repos", 1)
}

fn strip_scheme(url: &str) -> &str {
    url.split_once(PROTOCOL_SEPARATOR).map_or(url, |(_, rest)| rest)
}

#[derive(Debug, PartialEq, Eq)]
struct MarketplaceUrl {
    slug: String,
    kind: MarketplaceLayout,
}

#[derive(Debug, PartialEq, Eq)]
enum MarketplaceLayout {
    /// `<prefix>/<slug>` with no recognized layout
    Root,
    /// `<prefix>/<slug>/trunk[/<subpath>]`
    Trunk { subpath: Option<String> },
    /// `<prefix>/<slug>/tags/<tag>`
    Tag { tag: String, trunk_url: String },
}

fn parse_marketplace_url(url: &str) -> Option<MarketplaceUrl> {
    let rest = MARKETPLACE_PREFIXES.iter().find_map(|prefix| url.strip_prefix(prefix))?;

    let (slug, remainder) = match rest.split_once('/') {
        Some((slug, remainder)) => (slug, Some(remainder)),
        None => (rest, None),
    };
    if slug.is_empty() {
        return None;
    }

    let kind = match remainder.map(|r| r.split_once('/').unwrap_or((r, ""))) {
        Some(("trunk", path)) => MarketplaceLayout::Trunk {
            subpath: Some(path.trim_matches('/').to_string()).filter(|p| !p.is_empty()),
        },
        Some(("tags", tag)) if !tag.is_empty() => MarketplaceLayout::Tag {
            tag: tag.to_string(),
            trunk_url: url.replacen(&format!("/tags/{tag}"), "/trunk", 1),
        },
        Some(("tags", _)) => MarketplaceLayout::Trunk {
            subpath: None,
        },
        _ => MarketplaceLayout::Root,
    };

    Some(MarketplaceUrl {
        slug: slug.to_string(),
        kind,
    })
}

/// Split `scheme://forge/owner/repo/path/in/repo` into root URL and path.
fn split_forge_url(url: &str) -> Option<(String, String)> {
    let rest = strip_scheme(url);
    let segments: Vec<&str> = rest.splitn(4, '/').collect();
    if segments.len() < 4 || !GENERIC_FORGES.contains(&segments[0]) {
        return None;
    }

    let path = segments[3].trim_matches('/');
    if path.is_empty() {
        return None;
    }

    let root = url.strip_suffix(segments[3])?.trim_end_matches('/').to_string();
    Some((root, path.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(dest_path: &str, reason: impl ToString) -> PackError {
    PackError::InvalidDeclaration {
        dest: dest_path.to_string(),
        reason: reason.to_string(),
    }
}
