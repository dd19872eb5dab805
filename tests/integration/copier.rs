//! Integration tests for copying checkouts into the package directory

use addonpack::cache::CacheStore;
use addonpack::external::normalize;
use addonpack::fetch::{FetchOptions, fetch_externals};
use addonpack::package::{IgnoreRules, copy_tree};
use anyhow::Result;
use std::fs;
use tempfile::TempDir;

use crate::common::TestProject;

#[tokio::test]
async fn test_nested_ignore_rules_apply_to_copy() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    let upstream = project.create_source_repo(
        "lib",
        &[
            (".pkgmeta", "ignore:\n  - tests/*\n  - \"*.md\"\n"),
            ("Lib.lua", "-- lib\n"),
            ("Lib.toc", "## Title: Lib\n"),
            ("README.md", "# readme\n"),
            ("tests/spec.lua", "-- spec\n"),
            ("docs/usage.md", "usage\n"),
            ("locale/enUS.lua", "-- enUS\n"),
        ],
    )?;

    let spec = normalize("Libs/Lib", upstream.file_url().as_str().into(), &cache)?;
    fetch_externals(vec![spec], &package, &cache, &FetchOptions::default()).await?;

    let dest = package.join("Libs/Lib");
    assert!(dest.join("Lib.lua").exists());
    assert!(dest.join("Lib.toc").exists());
    assert!(dest.join("locale/enUS.lua").exists());
    assert!(!dest.join("README.md").exists());
    assert!(!dest.join("docs/usage.md").exists());
    assert!(!dest.join("tests").exists());
    assert!(!dest.join(".pkgmeta").exists());
    assert!(!dest.join(".git").exists());
    Ok(())
}

#[tokio::test]
async fn test_destination_is_replaced_on_refetch() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();
    let upstream = project.create_source_repo("lib", &[("Lib.lua", "-- lib\n")])?;

    let stale = package.join("Libs/Lib/Removed.lua");
    fs::create_dir_all(stale.parent().unwrap())?;
    fs::write(&stale, "-- left over\n")?;

    let spec = normalize("Libs/Lib", upstream.file_url().as_str().into(), &cache)?;
    fetch_externals(vec![spec], &package, &cache, &FetchOptions::default()).await?;

    assert!(package.join("Libs/Lib/Lib.lua").exists());
    assert!(!stale.exists());
    Ok(())
}

#[test]
fn test_copy_tree_counts_copied_files() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("sub/deeper")).unwrap();
    fs::write(src.path().join("a.lua"), "a").unwrap();
    fs::write(src.path().join("sub/b.lua"), "b").unwrap();
    fs::write(src.path().join("sub/deeper/c.xml"), "c").unwrap();
    fs::write(src.path().join(".hidden"), "h").unwrap();

    let rules = IgnoreRules::new(&["*.xml"]).unwrap();
    let copied = copy_tree(src.path(), dst.path(), &rules).unwrap();

    assert_eq!(copied, 2);
    assert!(dst.path().join("sub/b.lua").exists());
    assert!(!dst.path().join("sub/deeper/c.xml").exists());
    assert!(!dst.path().join(".hidden").exists());
}
