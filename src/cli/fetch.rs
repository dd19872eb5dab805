//! `addonpack fetch`

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cache::CacheStore;
use crate::config::{GlobalConfig, force_externals_from_env};
use crate::external::{Backend, CheckoutSelector, ExternalDependencySpec};
use crate::fetch::{FetchOptions, FetchReport, fetch_externals};
use crate::pkgmeta::PkgMeta;

/// Directory under the project receiving packages by default.
const RELEASE_DIR: &str = ".release";

/// Fetch all externals declared in the packaging metadata.
#[derive(Args, Debug)]
pub struct FetchCommand {
    /// Directory receiving the externals (default: ./.release/<package-as>)
    #[arg(long)]
    package_dir: Option<PathBuf>,

    /// Packaging metadata file (default: pkgmeta.yml, then .pkgmeta)
    #[arg(long)]
    pkgmeta: Option<PathBuf>,

    /// Ignore every staleness marker and refresh all caches
    #[arg(short = 'E', long)]
    force_externals: bool,

    /// Only parse and list the declarations
    #[arg(short = 'e', long, conflicts_with = "force_externals")]
    skip_externals: bool,

    /// Maximum number of dependencies fetched concurrently
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_parallel: Option<u32>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// A declaration as printed by `--skip-externals`.
#[derive(Debug, Serialize)]
struct PlannedExternal<'a> {
    dest_path: &'a str,
    backend: Backend,
    url: &'a str,
    selector: &'a CheckoutSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    subpath: Option<&'a str>,
    cache_slot: &'a Path,
}

impl<'a> From<&'a ExternalDependencySpec> for PlannedExternal<'a> {
    fn from(spec: &'a ExternalDependencySpec) -> Self {
        Self {
            dest_path: &spec.dest_path,
            backend: spec.backend,
            url: &spec.url,
            selector: &spec.selector,
            subpath: spec.subpath.as_deref(),
            cache_slot: &spec.cache_slot,
        }
    }
}

impl FetchCommand {
    /// Run the command in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be found or parsed, or if any
    /// external fails to fetch.
    pub async fn execute(self) -> Result<()> {
        let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
        self.execute_in(&cwd).await
    }

    async fn execute_in(self, project_dir: &Path) -> Result<()> {
        let pkgmeta_path = match &self.pkgmeta {
            Some(path) => project_dir.join(path),
            None => match PkgMeta::find(project_dir) {
                Some(path) => path,
                None => bail!("No pkgmeta.yml or .pkgmeta file found in {}", project_dir.display()),
            },
        };
        tracing::debug!("Using pkgmeta file: {}", pkgmeta_path.display());
        let meta = PkgMeta::load(&pkgmeta_path)?;

        let config = GlobalConfig::load().await?;
        let cache = CacheStore::new()?;
        let specs = meta.externals(&cache)?;

        if self.skip_externals {
            return self.print_plan(&specs);
        }

        let package_dir = self
            .package_dir
            .clone()
            .map(|dir| project_dir.join(dir))
            .unwrap_or_else(|| project_dir.join(RELEASE_DIR).join(meta.package_name(project_dir)));

        let mut options = FetchOptions::from_config(&config)
            .with_force(self.force_externals || force_externals_from_env())
            .with_manual_embeds(meta.embedded_libraries.clone());
        if let Some(max) = self.max_parallel {
            options = options.with_max_parallel(max as usize);
        }

        let report = fetch_externals(specs, &package_dir, &cache, &options).await?;
        self.print_report(&report, &package_dir)
    }

    fn print_plan(&self, specs: &[ExternalDependencySpec]) -> Result<()> {
        if self.json {
            let planned: Vec<PlannedExternal<'_>> = specs.iter().map(PlannedExternal::from).collect();
            println!("{}", serde_json::to_string_pretty(&planned)?);
            return Ok(());
        }

        if specs.is_empty() {
            println!("No externals declared.");
            return Ok(());
        }

        println!("{} (not fetched)", "Externals".bold());
        for spec in specs {
            println!("  {} {} [{}] {}", spec.dest_path.cyan(), spec.backend.colored_name(), spec.selector, spec.url);
        }
        Ok(())
    }

    fn print_report(&self, report: &FetchReport, package_dir: &Path) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
            return Ok(());
        }

        for external in &report.externals {
            let source = if external.from_cache {
                "cached".dimmed()
            } else {
                "fetched".green()
            };
            println!("✅ {} {} ({source})", external.dest_path.cyan(), external.resolved);
        }
        for dest in &report.skipped {
            println!("⚠️  {} skipped (unsupported backend)", dest.yellow());
        }
        if !report.embedded_libraries.is_empty() {
            println!("{} {}", "Embedded libraries:".bold(), report.embedded_libraries.join(", "));
        }
        println!(
            "Fetched {} externals into {} in {:.2}s",
            report.externals.len(),
            package_dir.display(),
            report.elapsed_ms as f64 / 1000.0
        );
        Ok(())
    }
}
