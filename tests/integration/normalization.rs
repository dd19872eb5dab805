//! Integration tests for reading declarations out of packaging metadata

use addonpack::cache::CacheStore;
use addonpack::core::PackError;
use addonpack::external::{Backend, CheckoutSelector};
use addonpack::pkgmeta::PkgMeta;
use tempfile::TempDir;

const PKGMETA: &str = r#"
package-as: MyAddon

externals:
  Libs/LibStub: https://repos.wowace.com/wow/libstub/trunk
  Libs/AceDB-3.0:
    url: git://git.wowace.com/wow/ace3/mainline.git
    tag: latest
  Libs/LibSharedMedia-3.0: https://repos.curseforge.com/wow/libsharedmedia-3-0/tags/v1.2
  /Libs/Widget/:
    url: https://github.com/owner/widgets/src/Widget
    branch: develop
    curse-slug: widget-lib
  Libs/Old:
    type: hg
    url: https://example.org/old

embedded-libraries:
  - libstub
"#;

#[test]
fn test_pkgmeta_declarations_are_normalized_in_order() {
    let cache = CacheStore::with_root("/cache");
    let meta = PkgMeta::parse(PKGMETA).unwrap();
    let specs = meta.externals(&cache).unwrap();

    let dests: Vec<&str> = specs.iter().map(|s| s.dest_path.as_str()).collect();
    assert_eq!(
        dests,
        ["Libs/LibStub", "Libs/AceDB-3.0", "Libs/LibSharedMedia-3.0", "Libs/Widget", "Libs/Old"]
    );

    let libstub = &specs[0];
    assert_eq!(libstub.backend, Backend::CentralizedVcs);
    assert_eq!(libstub.selector, CheckoutSelector::Default);
    assert_eq!(libstub.attribution_slug.as_deref(), Some("libstub"));

    let acedb = &specs[1];
    assert_eq!(acedb.backend, Backend::DistributedVcs);
    assert_eq!(acedb.url, "https://repos.wowace.com/wow/ace3");
    assert!(acedb.selector.is_latest_tag());
    assert_eq!(acedb.attribution_slug.as_deref(), Some("ace3"));

    let lsm = &specs[2];
    assert_eq!(lsm.backend, Backend::CentralizedVcs);
    assert_eq!(lsm.url, "https://repos.curseforge.com/wow/libsharedmedia-3-0/trunk");
    assert_eq!(lsm.selector, CheckoutSelector::Tag("v1.2".into()));

    let widget = &specs[3];
    assert_eq!(widget.url, "https://github.com/owner/widgets");
    assert_eq!(widget.subpath.as_deref(), Some("src/Widget"));
    assert_eq!(widget.selector, CheckoutSelector::Branch("develop".into()));
    assert_eq!(widget.attribution_slug.as_deref(), Some("widget-lib"));
    assert_eq!(widget.checkout_path(), widget.cache_slot.join("src/Widget"));

    assert_eq!(specs[4].backend, Backend::LegacyVcs);
    assert_eq!(meta.embedded_libraries, ["libstub"]);
}

#[test]
fn test_canonical_urls_round_trip_through_pkgmeta() {
    let cache = CacheStore::with_root("/cache");
    let meta = PkgMeta::parse(PKGMETA).unwrap();
    let specs = meta.externals(&cache).unwrap();

    let rewritten: String = specs
        .iter()
        .filter(|s| s.selector == CheckoutSelector::Default && s.backend != Backend::LegacyVcs)
        .map(|s| format!("  {}: {}\n", s.dest_path, s.url))
        .collect();
    let again = PkgMeta::parse(&format!("externals:\n{rewritten}")).unwrap().externals(&cache).unwrap();

    for spec in &again {
        let original = specs.iter().find(|s| s.dest_path == spec.dest_path).unwrap();
        assert_eq!(spec.url, original.url);
        assert_eq!(spec.backend, original.backend);
        assert_eq!(spec.cache_slot, original.cache_slot);
    }
    assert!(!again.is_empty());
}

#[test]
fn test_declaration_without_url_is_rejected() {
    let cache = CacheStore::with_root("/cache");
    let meta = PkgMeta::parse("externals:\n  Libs/Broken:\n    tag: v1\n").unwrap();

    let err = meta.externals(&cache).unwrap_err();
    assert!(matches!(err, PackError::InvalidDeclaration { ref dest, .. } if dest == "Libs/Broken"));
}

#[test]
fn test_pkgmeta_discovery_prefers_yml() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(".pkgmeta"), "package-as: Dotted\n").unwrap();
    assert_eq!(PkgMeta::find(temp.path()), Some(temp.path().join(".pkgmeta")));

    std::fs::write(temp.path().join("pkgmeta.yml"), "package-as: Yaml\n").unwrap();
    let meta = PkgMeta::load_from_dir(temp.path()).unwrap().unwrap();
    assert_eq!(meta.package_as.as_deref(), Some("Yaml"));
}
