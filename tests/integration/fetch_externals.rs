//! Integration tests for the concurrent fetch orchestrator

use addonpack::cache::CacheStore;
use addonpack::core::PackError;
use addonpack::external::{CheckoutSelector, DeclarationRecord, ExternalDependencySpec, normalize};
use addonpack::fetch::{FetchOptions, fetch_externals};
use anyhow::Result;
use std::fs;

use crate::common::TestProject;

fn declare(dest: &str, record: DeclarationRecord, cache: &CacheStore) -> ExternalDependencySpec {
    normalize(dest, record.into(), cache).unwrap()
}

fn record(url: String) -> DeclarationRecord {
    DeclarationRecord {
        url: Some(url),
        ..DeclarationRecord::default()
    }
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_others() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    let first = project.create_source_repo("first", &[("First.lua", "-- first\n")])?;
    let broken = project.create_source_repo("broken", &[("Broken.lua", "-- broken\n")])?;
    let third = project.create_source_repo("third", &[("Third.lua", "-- third\n")])?;

    let mut bad_branch = record(broken.file_url());
    bad_branch.branch = Some("does-not-exist".into());
    let specs = vec![
        declare("Libs/First", record(first.file_url()), &cache),
        declare("Libs/Broken", bad_branch, &cache),
        declare("Libs/Third", record(third.file_url()), &cache),
    ];
    let first_slot = specs[0].cache_slot.clone();
    let third_slot = specs[2].cache_slot.clone();

    let err = fetch_externals(specs, &package, &cache, &FetchOptions::default().with_max_parallel(1))
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("Libs/Broken"), "{message}");
    assert!(!message.contains("Libs/First"), "{message}");
    assert!(!message.contains("Libs/Third"), "{message}");

    // Siblings were fetched into the cache and copied
    assert!(first_slot.join("First.lua").exists());
    assert!(third_slot.join("Third.lua").exists());
    assert!(package.join("Libs/First/First.lua").exists());
    assert!(package.join("Libs/Third/Third.lua").exists());
    assert!(!package.join("Libs/Broken/Broken.lua").exists());

    Ok(())
}

#[tokio::test]
async fn test_abbreviated_commit_is_resolved() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    let upstream = project.create_source_repo("lib", &[("Lib.lua", "-- one\n")])?;
    upstream.write_file("Lib.lua", "-- two\n")?;
    let pinned = upstream.commit_all("two")?;
    upstream.write_file("Lib.lua", "-- three\n")?;
    upstream.commit_all("three")?;

    let mut pin = record(upstream.file_url());
    pin.commit = Some(pinned[..8].to_string());

    let report =
        fetch_externals(vec![declare("Libs/Lib", pin, &cache)], &package, &cache, &FetchOptions::default()).await?;

    assert_eq!(report.externals[0].resolved, CheckoutSelector::Commit(pinned.clone()));
    assert_eq!(fs::read_to_string(package.join("Libs/Lib/Lib.lua"))?, "-- two\n");
    Ok(())
}

#[tokio::test]
async fn test_unknown_commit_prefix_fails() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let upstream = project.create_source_repo("lib", &[("Lib.lua", "-- one\n")])?;

    let head = upstream.rev_parse_head()?;
    // Flip the first hex digit so the prefix cannot match any commit
    let flipped = if head.starts_with('0') { "1" } else { "0" };
    let mut pin = record(upstream.file_url());
    pin.commit = Some(format!("{flipped}{}", &head[1..9]));

    let err = fetch_externals(
        vec![declare("Libs/Lib", pin, &cache)],
        &project.release_path(),
        &cache,
        &FetchOptions::default(),
    )
    .await
    .unwrap_err();

    let pack_error = err.downcast_ref::<PackError>();
    assert!(matches!(pack_error, Some(PackError::CommitNotFound { .. })), "{err:#}");
    Ok(())
}

#[tokio::test]
async fn test_latest_tag_and_attribution_slugs() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    let upstream = project.create_source_repo("lib", &[("Lib.lua", "-- 1.0\n")])?;
    upstream.tag("v1.0")?;
    upstream.write_file("Lib.lua", "-- 1.1\n")?;
    upstream.commit_all("1.1")?;
    upstream.tag("v1.1")?;
    upstream.write_file("Lib.lua", "-- unreleased\n")?;
    upstream.commit_all("wip")?;

    let mut latest = record(upstream.file_url());
    latest.tag = Some("latest".into());
    latest.curse_slug = Some("lib-slug".into());

    let mut old = record("https://example.org/old".into());
    old.kind = Some("hg".into());

    let options = FetchOptions::default().with_manual_embeds(vec!["zzz-manual".into(), "lib-slug".into()]);
    let report = fetch_externals(
        vec![declare("Libs/Lib", latest, &cache), declare("Libs/Old", old, &cache)],
        &package,
        &cache,
        &options,
    )
    .await?;

    assert_eq!(report.externals.len(), 1);
    assert_eq!(report.externals[0].resolved, CheckoutSelector::Tag("v1.1".into()));
    assert_eq!(report.skipped, ["Libs/Old"]);
    assert_eq!(report.embedded_libraries, ["lib-slug", "zzz-manual"]);
    assert_eq!(fs::read_to_string(package.join("Libs/Lib/Lib.lua"))?, "-- 1.1\n");
    Ok(())
}

#[tokio::test]
async fn test_subpath_is_vendored_alone() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    let upstream = project.create_source_repo(
        "mono",
        &[("README.md", "# mono\n"), ("libs/Widget/Widget.lua", "-- widget\n")],
    )?;
    let mut nested = record(upstream.file_url());
    nested.path = Some("libs/Widget".into());

    fetch_externals(vec![declare("Libs/Widget", nested, &cache)], &package, &cache, &FetchOptions::default())
        .await?;

    assert!(package.join("Libs/Widget/Widget.lua").exists());
    assert!(!package.join("Libs/Widget/README.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_shared_slot_dependencies_take_turns() -> Result<()> {
    let project = TestProject::new()?;
    let cache = CacheStore::with_root(project.cache_path());
    let package = project.release_path();

    let ace = project.create_source_repo(
        "ace3",
        &[
            ("AceGUI/AceGUI.lua", "-- gui\n"),
            ("AceConfig/AceConfig.lua", "-- config\n"),
            ("Ace3.toc", "## Title: Ace3\n"),
        ],
    )?;

    let declare_both = || {
        vec![
            declare("Libs/AceGUI", record_with_path(ace.file_url(), "AceGUI"), &cache),
            declare("Libs/AceConfig", record_with_path(ace.file_url(), "AceConfig"), &cache),
        ]
    };
    let specs = declare_both();
    assert_eq!(specs[0].cache_slot, specs[1].cache_slot);

    let report = fetch_externals(specs, &package, &cache, &FetchOptions::default()).await?;

    assert_eq!(report.externals.len(), 2);
    assert_eq!(report.externals.iter().filter(|e| e.from_cache).count(), 1);
    assert!(package.join("Libs/AceGUI/AceGUI.lua").exists());
    assert!(!package.join("Libs/AceGUI/AceConfig").exists());
    assert!(package.join("Libs/AceConfig/AceConfig.lua").exists());
    assert!(!package.join("Libs/AceConfig/AceGUI").exists());

    // Forced refresh of both members refetches the shared slot one at a time
    let report =
        fetch_externals(declare_both(), &package, &cache, &FetchOptions::default().with_force(true)).await?;
    assert!(report.externals.iter().all(|e| !e.from_cache));
    assert!(package.join("Libs/AceConfig/AceConfig.lua").exists());

    Ok(())
}

fn record_with_path(url: String, path: &str) -> DeclarationRecord {
    DeclarationRecord {
        path: Some(path.to_string()),
        ..record(url)
    }
}
