//! addonpack - external dependency resolution for addon packaging
//!
//! Addon projects vendor libraries hosted on git and svn servers. addonpack
//! turns the `externals` declared in a project's packaging metadata into
//! cached, verified checkouts and copies them into the package directory.
//!
//! # Architecture Overview
//!
//! ```text
//! pkgmeta.yml ──► normalize ──► fetch (bounded fan-out) ──► checkout driver ──► copier
//!                    │                                        │
//!                    └────────── CacheStore ◄─────────────────┘
//!                               (slots + staleness markers)
//! ```
//!
//! - Every declaration is normalized into an
//!   [`ExternalDependencySpec`](external::ExternalDependencySpec): backend,
//!   canonical URL, checkout selector, in-repo subpath and cache slot.
//! - Each cache slot holds one checkout shared by all builds on the machine.
//!   A staleness marker next to it records the last successful update; slots
//!   younger than 24 hours are reused without touching the network.
//! - The git driver clones, fetches and resolves branches, tags, abbreviated
//!   commits and the default branch. The svn driver maps selectors onto the
//!   `trunk` / `branches` / `tags` layout, discovers the latest tag, and retries
//!   transient server failures.
//! - The orchestrator fetches dependencies concurrently, attempts all of them
//!   even when one fails, and collects attribution slugs for crediting
//!   embedded libraries.
//!
//! # Core Modules
//!
//! - [`external`] - declaration model and normalizer
//! - [`cache`] - cache store and staleness markers
//! - [`git`] / [`svn`] - async wrappers around the VCS binaries
//! - [`checkout`] - per-backend checkout drivers
//! - [`fetch`] - concurrent fetch orchestrator
//! - [`package`] - cache-to-package copier
//! - [`pkgmeta`] - packaging metadata reader
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface
//! - [`config`] - cache location and global configuration
//! - [`core`] - error types and user-facing error rendering
//! - [`utils`] - filesystem, platform and backoff helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use addonpack::cache::CacheStore;
//! use addonpack::fetch::{FetchOptions, fetch_externals};
//! use addonpack::pkgmeta::PkgMeta;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let meta = PkgMeta::load(Path::new("pkgmeta.yml"))?;
//! let cache = CacheStore::new()?;
//! let specs = meta.externals(&cache)?;
//!
//! let options = FetchOptions::default().with_manual_embeds(meta.embedded_libraries.clone());
//! let report = fetch_externals(specs, Path::new(".release/MyAddon"), &cache, &options).await?;
//! for external in &report.externals {
//!     println!("{} -> {}", external.dest_path, external.resolved);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod checkout;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod external;
pub mod fetch;
pub mod git;
pub mod package;
pub mod pkgmeta;
pub mod svn;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
