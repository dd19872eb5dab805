//! Fetch orchestrator
//!
//! Runs every declared dependency through its checkout driver and the
//! cache-to-package copier, at most `max_parallel` at a time. A failing
//! dependency never interrupts its siblings: all are attempted, every error is
//! logged, and the first error collected fails the fetch.
//!
//! Dependencies that share a cache slot (same repository and selector, different
//! subpath) take turns: each holds the slot's lock from checkout until its copy
//! is done, so the later ones find a fresh slot and copy from the cache.
//!
//! ```rust,no_run
//! use addonpack::cache::CacheStore;
//! use addonpack::fetch::{FetchOptions, fetch_externals};
//!
//! # async fn example(specs: Vec<addonpack::external::ExternalDependencySpec>) -> anyhow::Result<()> {
//! let cache = CacheStore::new()?;
//! let report = fetch_externals(specs, "/build/MyAddon".as_ref(), &cache, &FetchOptions::default()).await?;
//! println!("embedded libraries: {:?}", report.embedded_libraries);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::cache::CacheStore;
use crate::checkout::{CheckoutOptions, Driver};
use crate::config::GlobalConfig;
use crate::constants::default_max_parallel;
use crate::external::{Backend, CheckoutResult, CheckoutSelector, ExternalDependencySpec};
use crate::package::copy_external;

/// Settings for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Driver settings (force flag, attribution marker, svn retries)
    pub checkout: CheckoutOptions,
    /// Maximum number of dependencies fetched concurrently
    pub max_parallel: usize,
    /// Attribution slugs declared by hand (`embedded-libraries`)
    pub manual_embeds: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            checkout: CheckoutOptions::default(),
            max_parallel: default_max_parallel(),
            manual_embeds: Vec::new(),
        }
    }
}

impl FetchOptions {
    /// Options taken from the global configuration.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            checkout: CheckoutOptions::from_config(config),
            max_parallel: config.max_parallel,
            manual_embeds: Vec::new(),
        }
    }

    /// Ignore every staleness marker.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.checkout.force = force;
        self
    }

    /// Override the concurrency bound; zero is treated as one.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Attribution slugs declared by hand.
    #[must_use]
    pub fn with_manual_embeds(mut self, embeds: Vec<String>) -> Self {
        self.manual_embeds = embeds;
        self
    }
}

/// One dependency that was fetched and copied.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedExternal {
    /// Destination relative to the package root
    pub dest_path: String,
    /// Hosting backend
    pub backend: Backend,
    /// Canonical repository URL
    pub url: String,
    /// Selector actually checked out
    pub resolved: CheckoutSelector,
    /// Cache directory the files were copied from
    pub checkout_path: PathBuf,
    /// Whether the cache slot was fresh
    pub from_cache: bool,
    /// Attribution slug, when one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_slug: Option<String>,
}

/// Outcome of a successful fetch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    /// Fetched dependencies, ordered by destination
    pub externals: Vec<FetchedExternal>,
    /// Destinations skipped because their backend has no driver
    pub skipped: Vec<String>,
    /// Deduplicated, sorted attribution slugs merged with the manual list
    pub embedded_libraries: Vec<String>,
    /// Wall-clock time of the run in milliseconds
    pub elapsed_ms: u128,
}

enum Outcome {
    Fetched(FetchedExternal),
    Skipped(String),
    Failed(anyhow::Error),
}

/// Fetch all `specs` into `package_dir`.
///
/// # Errors
///
/// Returns the first dependency error collected once every dependency has
/// been attempted; the others are logged.
pub async fn fetch_externals(
    specs: Vec<ExternalDependencySpec>,
    package_dir: &Path,
    cache: &CacheStore,
    options: &FetchOptions,
) -> Result<FetchReport> {
    let start = Instant::now();
    let total = specs.len();
    tracing::debug!("Fetching {total} external dependencies");

    if total == 0 {
        return Ok(FetchReport {
            embedded_libraries: merge_embeds(&options.manual_embeds, &[]),
            ..FetchReport::default()
        });
    }

    cache.ensure_root()?;

    let slot_locks = slot_locks(&specs);
    let max_parallel = options.max_parallel.max(1);
    let outcomes: Vec<Outcome> = stream::iter(specs)
        .map(|spec| {
            let lock = slot_locks.get(&spec.cache_slot).cloned().unwrap_or_default();
            fetch_one(spec, package_dir, &options.checkout, lock)
        })
        .buffer_unordered(max_parallel)
        .collect()
        .await;

    let mut fetched = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Fetched(external) => fetched.push(external),
            Outcome::Skipped(dest) => skipped.push(dest),
            Outcome::Failed(error) => {
                tracing::error!("{error:#}");
                errors.push(error);
            }
        }
    }

    if let Some(first) = errors.into_iter().next() {
        return Err(first.context("Error fetching externals"));
    }

    let elapsed = start.elapsed();
    tracing::info!("All external dependencies fetched in {:.2}s", elapsed.as_secs_f64());

    warn_missing_slugs(&fetched, &options.manual_embeds);

    let found: Vec<String> = fetched.iter().filter_map(|e| e.attribution_slug.clone()).collect();
    fetched.sort_by(|a, b| a.dest_path.cmp(&b.dest_path));
    skipped.sort();

    Ok(FetchReport {
        externals: fetched,
        skipped,
        embedded_libraries: merge_embeds(&options.manual_embeds, &found),
        elapsed_ms: elapsed.as_millis(),
    })
}

/// One lock per distinct cache slot.
fn slot_locks(specs: &[ExternalDependencySpec]) -> HashMap<PathBuf, Arc<Mutex<()>>> {
    let mut locks: HashMap<PathBuf, Arc<Mutex<()>>> = HashMap::new();
    for spec in specs {
        if locks.contains_key(&spec.cache_slot) {
            tracing::debug!("({}) Waits for shared cache slot {}", spec.dest_path, spec.cache_slot.display());
        }
        locks.entry(spec.cache_slot.clone()).or_default();
    }
    locks
}

async fn fetch_one(
    spec: ExternalDependencySpec,
    package_dir: &Path,
    options: &CheckoutOptions,
    slot_lock: Arc<Mutex<()>>,
) -> Outcome {
    let dest = spec.dest_path.clone();
    let _guard = slot_lock.lock().await;
    match checkout_and_copy(spec, package_dir, options).await {
        Ok(Some(external)) => Outcome::Fetched(external),
        Ok(None) => Outcome::Skipped(dest),
        Err(error) => Outcome::Failed(error.context(format!("Failed to fetch external '{dest}'"))),
    }
}

async fn checkout_and_copy(
    spec: ExternalDependencySpec,
    package_dir: &Path,
    options: &CheckoutOptions,
) -> Result<Option<FetchedExternal>> {
    tracing::info!("Processing external for {} ({})", spec.dest_path, spec.backend);

    let driver = Driver::for_spec(&spec, options)?;
    let Some(result) = driver.checkout().await? else {
        return Ok(None);
    };

    let copy_spec = spec.clone();
    let copy_result = result.clone();
    let package_dir = package_dir.to_path_buf();
    tokio::task::spawn_blocking(move || copy_external(&copy_spec, &copy_result, &package_dir))
        .await
        .context("Copy task failed")??;

    Ok(Some(fetched(spec, result)))
}

fn fetched(spec: ExternalDependencySpec, result: CheckoutResult) -> FetchedExternal {
    FetchedExternal {
        dest_path: spec.dest_path,
        backend: spec.backend,
        url: spec.url,
        resolved: result.resolved,
        checkout_path: result.path,
        from_cache: result.from_cache,
        attribution_slug: result.attribution_slug,
    }
}

fn warn_missing_slugs(fetched: &[FetchedExternal], manual_embeds: &[String]) {
    let missing: Vec<&str> = fetched
        .iter()
        .filter(|e| e.attribution_slug.is_none())
        .map(|e| e.dest_path.as_str())
        .collect();
    if missing.is_empty() {
        return;
    }

    if manual_embeds.is_empty() {
        for dest in &missing {
            tracing::warn!(
                "No attribution slug found for {dest} and no embedded-libraries are declared in the package metadata"
            );
        }
        tracing::warn!(
            "Add a curse-slug to the external or list it under embedded-libraries to credit the author(s)"
        );
        return;
    }

    for dest in &missing {
        tracing::warn!("No attribution slug found for {dest}");
    }
    let credited = fetched.len() - missing.len() + manual_embeds.len();
    if credited < fetched.len() {
        tracing::warn!(
            "Attribution slugs could not be determined for one or more externals and may be missing from embedded-libraries"
        );
    }
}

/// Deduplicated, sorted union of the manual and discovered slugs.
#[must_use]
pub fn merge_embeds(manual: &[String], found: &[String]) -> Vec<String> {
    manual.iter().chain(found).cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{DeclarationRecord, normalize};
    use crate::test_utils::TestGit;
    use tempfile::TempDir;

    #[test]
    fn test_merge_embeds_dedupes_and_sorts() {
        let manual = vec!["libstub".to_string(), "ace3".to_string()];
        let found = vec!["ace3".to_string(), "callbackhandler".to_string()];
        assert_eq!(merge_embeds(&manual, &found), vec!["ace3", "callbackhandler", "libstub"]);
    }

    #[test]
    fn test_options_builders() {
        let options = FetchOptions::default().with_force(true).with_max_parallel(0);
        assert!(options.checkout.force);
        assert_eq!(options.max_parallel, 1);
    }

    #[tokio::test]
    async fn test_empty_fetch_reports_manual_embeds() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::with_root(temp.path().join("cache"));
        let options = FetchOptions::default().with_manual_embeds(vec!["libstub".to_string()]);

        let report = fetch_externals(Vec::new(), temp.path(), &cache, &options).await.unwrap();
        assert!(report.externals.is_empty());
        assert_eq!(report.embedded_libraries, vec!["libstub"]);
    }

    #[tokio::test]
    async fn test_fetch_copies_and_collects_slugs() {
        let temp = TempDir::new().unwrap();
        let upstream = TestGit::init_with_files(
            temp.path().join("upstream"),
            &[("LibFoo.lua", "-- lib\n"), ("LibFoo.toc", "## Title: LibFoo\n")],
        )
        .unwrap();
        let cache = CacheStore::with_root(temp.path().join("cache"));
        let spec = normalize(
            "Libs/LibFoo",
            DeclarationRecord {
                url: Some(upstream.file_url()),
                curse_slug: Some("libfoo".to_string()),
                ..DeclarationRecord::default()
            }
            .into(),
            &cache,
        )
        .unwrap();
        let package = temp.path().join("package");

        let report = fetch_externals(vec![spec], &package, &cache, &FetchOptions::default()).await.unwrap();

        assert_eq!(report.externals.len(), 1);
        assert_eq!(report.embedded_libraries, vec!["libfoo"]);
        assert!(package.join("Libs/LibFoo/LibFoo.lua").exists());
        assert!(!package.join("Libs/LibFoo/.git").exists());
    }

    #[test]
    fn test_slot_locks_one_per_slot() {
        let cache = CacheStore::with_root("/cache");
        let declare = |dest: &str, path: Option<&str>| {
            normalize(
                dest,
                DeclarationRecord {
                    url: Some("https://git.example.com/ace3.git".to_string()),
                    path: path.map(str::to_string),
                    ..DeclarationRecord::default()
                }
                .into(),
                &cache,
            )
            .unwrap()
        };
        let specs = vec![
            declare("Libs/AceGUI", Some("AceGUI-3.0")),
            declare("Libs/AceConfig", Some("AceConfig-3.0")),
            declare("Libs/Ace3", None),
        ];

        let locks = slot_locks(&specs);
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key(&specs[0].cache_slot));
    }
}
