//! Integration test suite for addonpack
//!
//! Every test builds its upstream repositories locally and reaches them
//! through `file://` URLs, so the suite needs `git` but no network.
//! svn-backed tests skip themselves when `svn` is not installed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//!
//! # Show library logs
//! RUST_LOG=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **cache_behavior**: Slot determinism, staleness markers, force refresh
//! - **cli**: End-to-end runs of the `addonpack` binary
//! - **copier**: Copying checkouts into the package with ignore rules
//! - **fetch_externals**: Concurrent fetch, partial failures, commit resolution
//! - **normalization**: Declaration parsing and canonicalization

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cache_behavior;
mod cli;
mod copier;
mod fetch_externals;
mod normalization;
