//! Common test utilities for addonpack integration tests

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use addonpack::test_utils::TestGit;

/// A throwaway addon project with its own cache and upstream repositories.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    project_dir: PathBuf,
    cache_dir: PathBuf,
    sources_dir: PathBuf,
}

impl TestProject {
    /// Create a new project named `MyAddon` with empty cache and sources directories
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("MyAddon");
        let cache_dir = temp_dir.path().join("cache");
        let sources_dir = temp_dir.path().join("sources");

        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&sources_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
            cache_dir,
            sources_dir,
        })
    }

    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_dir
    }

    /// Package directory used by `fetch` when `--package-dir` is not given
    pub fn release_path(&self) -> PathBuf {
        self.project_dir.join(".release").join("MyAddon")
    }

    /// Create an upstream git repository with the given files committed on `main`
    pub fn create_source_repo(&self, name: &str, files: &[(&str, &str)]) -> Result<TestGit> {
        TestGit::init_with_files(self.sources_dir.join(name), files)
    }

    pub fn write_pkgmeta(&self, content: &str) -> Result<()> {
        fs::write(self.project_dir.join("pkgmeta.yml"), content)?;
        Ok(())
    }

    /// `addonpack` command isolated from the user's cache and config
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("addonpack").unwrap();
        cmd.current_dir(&self.project_dir)
            .env("ADDONPACK_CACHE_DIR", &self.cache_dir)
            .env("ADDONPACK_CONFIG", self.project_dir.join("no-config.toml"))
            .env_remove("ADDONPACK_FORCE_EXTERNALS")
            .env_remove("RUST_LOG");
        cmd
    }
}
