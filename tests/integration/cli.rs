//! End-to-end tests for the `addonpack` binary

use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use crate::common::TestProject;

#[test]
fn test_cache_dir_honours_environment() -> Result<()> {
    let project = TestProject::new()?;

    project
        .command()
        .args(["cache", "dir"])
        .assert()
        .success()
        .stdout(predicate::str::contains(project.cache_path().display().to_string()));
    Ok(())
}

#[test]
fn test_cache_clear() -> Result<()> {
    let project = TestProject::new()?;
    fs::create_dir_all(project.cache_path().join("some_slot"))?;

    project.command().args(["cache", "clear"]).assert().success().stdout(predicate::str::contains("Cleared"));
    assert!(!project.cache_path().exists());

    project.command().args(["cache", "clear"]).assert().success().stdout(predicate::str::contains("already empty"));
    Ok(())
}

#[test]
fn test_skip_externals_lists_plan_as_json() -> Result<()> {
    let project = TestProject::new()?;
    project.write_pkgmeta(
        "package-as: MyAddon\nexternals:\n  Libs/LibStub: https://repos.wowace.com/wow/libstub/trunk\n",
    )?;

    let output = project.command().args(["fetch", "--skip-externals", "--json"]).assert().success();
    let planned: serde_json::Value = serde_json::from_slice(&output.get_output().stdout)?;

    assert_eq!(planned[0]["dest_path"], "Libs/LibStub");
    assert_eq!(planned[0]["backend"], "svn");
    assert_eq!(planned[0]["selector"]["kind"], "default");
    assert!(!project.cache_path().exists(), "nothing is fetched");
    Ok(())
}

#[test]
fn test_fetch_into_release_directory() -> Result<()> {
    let project = TestProject::new()?;
    let upstream = project.create_source_repo("libfoo", &[("LibFoo.lua", "-- lib\n")])?;
    project.write_pkgmeta(&format!(
        "package-as: MyAddon\nexternals:\n  Libs/LibFoo:\n    url: {}\n    curse-slug: libfoo\n",
        upstream.file_url()
    ))?;

    project.command().arg("fetch").assert().success().stdout(predicate::str::contains("Libs/LibFoo"));
    assert!(project.release_path().join("Libs/LibFoo/LibFoo.lua").exists());

    let output = project.command().args(["fetch", "--json"]).assert().success();
    let report: serde_json::Value = serde_json::from_slice(&output.get_output().stdout)?;
    assert_eq!(report["externals"][0]["from_cache"], true);
    assert_eq!(report["embedded_libraries"][0], "libfoo");
    Ok(())
}

#[test]
fn test_fetch_failure_exits_nonzero() -> Result<()> {
    let project = TestProject::new()?;
    let upstream = project.create_source_repo("libfoo", &[("LibFoo.lua", "-- lib\n")])?;
    project.write_pkgmeta(&format!(
        "externals:\n  Libs/LibFoo:\n    url: {}\n    branch: nope\n",
        upstream.file_url()
    ))?;

    project.command().arg("fetch").assert().failure().code(1).stderr(predicate::str::contains("Libs/LibFoo"));
    Ok(())
}

#[test]
fn test_missing_pkgmeta_exits_nonzero() -> Result<()> {
    let project = TestProject::new()?;

    project
        .command()
        .arg("fetch")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No pkgmeta.yml or .pkgmeta"));
    Ok(())
}
