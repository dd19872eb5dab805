//! Integration tests for the shared externals cache and its staleness markers

use addonpack::cache::{CacheStore, StalenessMarker};
use addonpack::constants::CACHE_VALIDITY_WINDOW;
use addonpack::external::{DeclarationRecord, ExternalDependencySpec, normalize};
use addonpack::fetch::{FetchOptions, fetch_externals};
use anyhow::Result;
use chrono::{TimeDelta, Utc};
use std::fs;

use crate::common::TestProject;

fn spec_for(url: &str, cache: &CacheStore) -> ExternalDependencySpec {
    normalize("Libs/LibFoo", url.into(), cache).unwrap()
}

#[test]
fn test_slot_is_shared_by_equivalent_declarations() {
    let cache = CacheStore::with_root("/cache");

    let from_url = spec_for("https://github.com/owner/lib", &cache);
    let from_record = normalize(
        "Other/Dest",
        DeclarationRecord {
            url: Some("https://github.com/owner/lib".into()),
            ..DeclarationRecord::default()
        }
        .into(),
        &cache,
    )
    .unwrap();
    assert_eq!(from_url.cache_slot, from_record.cache_slot);

    let mirror = spec_for("git://git.wowace.com/wow/ace3/mainline.git", &cache);
    let canonical = spec_for(&mirror.url, &cache);
    assert_eq!(mirror.cache_slot, canonical.cache_slot);

    let tagged = normalize(
        "Libs/LibFoo",
        DeclarationRecord {
            url: Some("https://github.com/owner/lib".into()),
            tag: Some("v1.0".into()),
            ..DeclarationRecord::default()
        }
        .into(),
        &cache,
    )
    .unwrap();
    assert_ne!(tagged.cache_slot, from_url.cache_slot);
    assert!(tagged.cache_slot.starts_with("/cache"));
}

#[test]
fn test_marker_window_and_corruption() {
    let temp = tempfile::TempDir::new().unwrap();
    let marker = StalenessMarker::for_slot(temp.path(), "v1.0");
    let now = Utc::now();

    assert!(marker.is_stale_at(now, CACHE_VALIDITY_WINDOW));

    marker.write_at(now).unwrap();
    assert!(!marker.is_stale_at(now + TimeDelta::hours(12), CACHE_VALIDITY_WINDOW));
    assert!(marker.exists());

    assert!(marker.is_stale_at(now + TimeDelta::hours(25), CACHE_VALIDITY_WINDOW));
    assert!(!marker.exists(), "expired marker is removed");

    fs::write(marker.path(), "not a timestamp").unwrap();
    assert!(marker.is_stale());
    assert!(!marker.exists(), "corrupt marker is removed");
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() -> Result<()> {
    let project = TestProject::new()?;
    let upstream = project.create_source_repo("libfoo", &[("LibFoo.lua", "-- v1\n")])?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();
    let options = FetchOptions::default();

    let first = fetch_externals(vec![spec_for(&upstream.file_url(), &cache)], &package, &cache, &options).await?;
    assert!(!first.externals[0].from_cache);

    let spec = spec_for(&upstream.file_url(), &cache);
    assert!(StalenessMarker::for_slot(&spec.cache_slot, "").exists());

    // New upstream commits stay invisible while the marker is fresh
    upstream.write_file("LibFoo.lua", "-- v2\n")?;
    upstream.commit_all("v2")?;

    let second = fetch_externals(vec![spec], &package, &cache, &options).await?;
    assert!(second.externals[0].from_cache);
    assert_eq!(fs::read_to_string(package.join("Libs/LibFoo/LibFoo.lua"))?, "-- v1\n");

    Ok(())
}

#[tokio::test]
async fn test_force_refreshes_fresh_slot() -> Result<()> {
    let project = TestProject::new()?;
    let upstream = project.create_source_repo("libfoo", &[("LibFoo.lua", "-- v1\n")])?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    fetch_externals(vec![spec_for(&upstream.file_url(), &cache)], &package, &cache, &FetchOptions::default())
        .await?;

    upstream.write_file("LibFoo.lua", "-- v2\n")?;
    upstream.commit_all("v2")?;

    let forced = FetchOptions::default().with_force(true);
    let report = fetch_externals(vec![spec_for(&upstream.file_url(), &cache)], &package, &cache, &forced).await?;
    assert!(!report.externals[0].from_cache);
    assert_eq!(fs::read_to_string(package.join("Libs/LibFoo/LibFoo.lua"))?, "-- v2\n");

    Ok(())
}

#[tokio::test]
async fn test_expired_marker_triggers_update() -> Result<()> {
    let project = TestProject::new()?;
    let upstream = project.create_source_repo("libfoo", &[("LibFoo.lua", "-- v1\n")])?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();
    let options = FetchOptions::default();

    let spec = spec_for(&upstream.file_url(), &cache);
    fetch_externals(vec![spec.clone()], &package, &cache, &options).await?;

    upstream.write_file("LibFoo.lua", "-- v2\n")?;
    upstream.commit_all("v2")?;
    StalenessMarker::for_slot(&spec.cache_slot, "").write_at(Utc::now() - TimeDelta::hours(25))?;

    let report = fetch_externals(vec![spec], &package, &cache, &options).await?;
    assert!(!report.externals[0].from_cache);
    assert_eq!(fs::read_to_string(package.join("Libs/LibFoo/LibFoo.lua"))?, "-- v2\n");

    Ok(())
}
