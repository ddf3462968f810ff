use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use symbolpack_cache::{CachedDependencies, LockFile, LockStore, PackageCache};
use symbolpack_core::{AppDependency, AppManifest, Requirement, Version};
use symbolpack_feed::{FeedError, FeedVersionIndex, PackageFeed};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::*;

const FEED: &str = "https://symbols.example.test/v3";
const PLATFORM: &str = "Microsoft.Application.symbols";
const LIB: &str = "Contoso.Lib.symbols.11111111-1111-1111-1111-111111111111";
const ADDON: &str = "Contoso.Addon.symbols.22222222-2222-2222-2222-222222222222";
const TOOLS: &str = "Contoso.Tools.symbols";
const LEGACY: &str = "Contoso.Legacy.symbols";

#[derive(Clone)]
struct FakePackage {
    version: String,
    dependencies: Vec<(String, String)>,
    descriptor: bool,
    artifact: bool,
}

#[derive(Default)]
struct FakeFeed {
    packages: BTreeMap<String, Vec<FakePackage>>,
    failing: Option<String>,
    list_calls: Vec<String>,
    downloads: Vec<String>,
}

impl FakeFeed {
    fn publish(&mut self, package_id: &str, version: &str, dependencies: &[(&str, &str)]) {
        self.publish_package(
            package_id,
            FakePackage {
                version: version.to_string(),
                dependencies: dependencies
                    .iter()
                    .map(|(id, range)| (id.to_string(), range.to_string()))
                    .collect(),
                descriptor: true,
                artifact: true,
            },
        );
    }

    fn publish_package(&mut self, package_id: &str, package: FakePackage) {
        self.packages
            .entry(package_id.to_ascii_lowercase())
            .or_default()
            .push(package);
    }

    fn reset_calls(&mut self) {
        self.list_calls.clear();
        self.downloads.clear();
    }
}

impl PackageFeed for FakeFeed {
    fn list_versions(
        &mut self,
        package_id: &str,
        feeds: &[String],
    ) -> Result<Option<FeedVersionIndex>> {
        self.list_calls.push(package_id.to_string());
        if self
            .failing
            .as_deref()
            .is_some_and(|failing| failing.eq_ignore_ascii_case(package_id))
        {
            return Err(FeedError::Status {
                package_id: package_id.to_string(),
                feed: FEED.to_string(),
                status: 503,
            }
            .into());
        }

        Ok(self
            .packages
            .get(&package_id.to_ascii_lowercase())
            .map(|versions| FeedVersionIndex {
                feed: feeds.first().cloned().unwrap_or_else(|| FEED.to_string()),
                versions: versions
                    .iter()
                    .map(|package| Version::parse(&package.version))
                    .collect(),
            }))
    }

    fn download_archive(
        &mut self,
        feed: &str,
        package_id: &str,
        version: &Version,
        destination_dir: &Path,
    ) -> Result<PathBuf> {
        self.downloads.push(format!("{package_id} {version}"));
        let package = self
            .packages
            .get(&package_id.to_ascii_lowercase())
            .and_then(|versions| {
                versions
                    .iter()
                    .find(|package| Version::parse(&package.version) == *version)
            })
            .cloned()
            .ok_or_else(|| FeedError::Status {
                package_id: package_id.to_string(),
                feed: feed.to_string(),
                status: 404,
            })?;

        fs::create_dir_all(destination_dir)?;
        let path = destination_dir.join(format!(
            "{}.{}.nupkg",
            package_id.to_ascii_lowercase(),
            version
        ));
        fs::write(&path, archive_bytes(package_id, &package))?;
        Ok(path)
    }
}

fn archive_bytes(package_id: &str, package: &FakePackage) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    if package.descriptor {
        let dependencies: String = package
            .dependencies
            .iter()
            .map(|(id, range)| format!("      <dependency id=\"{id}\" version=\"{range}\" />\n"))
            .collect();
        let nuspec = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{package_id}</id>
    <version>{}</version>
    <dependencies>
{dependencies}    </dependencies>
  </metadata>
</package>"#,
            package.version
        );
        writer
            .start_file(format!("{package_id}.nuspec"), SimpleFileOptions::default())
            .expect("must start descriptor entry");
        writer
            .write_all(nuspec.as_bytes())
            .expect("must write descriptor entry");
    }
    if package.artifact {
        writer
            .start_file(
                format!("symbols/{package_id}_{}.app", package.version),
                SimpleFileOptions::default(),
            )
            .expect("must start artifact entry");
        writer
            .write_all(format!("{package_id} {}", package.version).as_bytes())
            .expect("must write artifact entry");
    }
    writer.finish().expect("must finish zip").into_inner()
}

fn manifest(application: Option<&str>, dependencies: &[(&str, &str, &str)]) -> AppManifest {
    AppManifest {
        id: "aaaaaaaa-0000-0000-0000-000000000001".to_string(),
        name: "My Extension".to_string(),
        publisher: "Fabrikam".to_string(),
        version: Some("1.0.0.0".to_string()),
        application: application.map(str::to_string),
        platform: application.map(str::to_string),
        runtime: Some("13.0".to_string()),
        dependencies: dependencies
            .iter()
            .map(|(name, id, version)| AppDependency {
                id: id.to_string(),
                name: name.to_string(),
                publisher: "Contoso".to_string(),
                version: version.to_string(),
            })
            .collect(),
    }
}

fn lib_and_addon_manifest() -> AppManifest {
    manifest(
        None,
        &[
            ("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0"),
            ("Addon", "22222222-2222-2222-2222-222222222222", "1.0.0.0"),
        ],
    )
}

fn feeds() -> Vec<String> {
    vec![FEED.to_string()]
}

fn lock_store(cache: &PackageCache, manifest: &AppManifest) -> LockStore {
    LockStore::new(cache.lock_path(&manifest.publisher, &manifest.name, &manifest.id))
}

/// Seeds the cache as if an earlier run had resolved one package.
fn seed_lock(
    cache: &PackageCache,
    manifest: &AppManifest,
    package_id: &str,
    version: &str,
    dependencies: &[Requirement],
) {
    cache.ensure_root().expect("must create cache root");
    let version = Version::parse(version);
    fs::write(cache.artifact_path(package_id, &version), b"cached").expect("must write artifact");
    cache
        .write_dependencies(
            package_id,
            &version,
            &CachedDependencies::new(dependencies.to_vec(), None),
        )
        .expect("must write dependencies");

    let mut locked = BTreeMap::new();
    locked.insert(package_id.to_string(), version.to_string());
    lock_store(cache, manifest)
        .save(&LockFile::for_manifest(manifest, locked, feeds()))
        .expect("must save lock");
}

fn versions_of(report: &ResolutionReport) -> Vec<(String, String)> {
    report
        .packages
        .values()
        .map(|package| (package.package_id.clone(), package.version.to_string()))
        .collect()
}

fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(id, version)| (id.to_string(), version.to_string()))
        .collect()
}

#[test]
fn resolves_transitive_closure_and_writes_lock() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(PLATFORM, "24.0.0.0", &[]);
    feed.publish(PLATFORM, "24.1.0.0", &[]);
    feed.publish(LIB, "1.0.0.0", &[(PLATFORM, "[24.0.0.0,)"), (TOOLS, "2.0.0.0")]);
    feed.publish(TOOLS, "2.0.0.0", &[]);
    feed.publish(TOOLS, "2.1.0.0", &[]);
    let manifest = manifest(
        Some("24.0.0.0"),
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert_eq!(
        versions_of(&report),
        pairs(&[
            (LIB, "1.0.0.0"),
            (TOOLS, "2.1.0.0"),
            (PLATFORM, "24.1.0.0"),
        ])
    );
    assert_eq!(report.processing_log, vec![PLATFORM, LIB, TOOLS]);
    assert_eq!(report.downloads, 3);
    assert_eq!(report.feed_queries, 3);
    assert!(report.conflicts.is_empty());
    assert!(report.warnings.is_empty());
    assert!(!report.reused_lock);

    let lib_artifact = &report.artifacts[LIB];
    assert_eq!(lib_artifact, &root.join("Contoso.Lib.1.0.0.0.app"));
    assert!(lib_artifact.is_file());
    assert!(root.join("Contoso.Tools.2.1.0.0.app").is_file());
    assert!(root.join("Microsoft.Application.24.1.0.0.app").is_file());
    assert_eq!(
        cache
            .read_dependencies(LIB, &Version::parse("1.0.0.0"))
            .map(|cached| cached.dependencies),
        Some(vec![
            Requirement::at_least(PLATFORM, "24.0.0.0"),
            Requirement::at_least(TOOLS, "2.0.0.0"),
        ])
    );
    assert_eq!(
        fs::read_dir(cache.downloads_dir())
            .expect("downloads dir must exist")
            .count(),
        0
    );

    let lock = lock_store(&cache, &manifest).load().expect("lock must exist");
    assert_eq!(
        report.lock_path,
        root.join("Fabrikam_My_Extension_aaaaaaaa-0000-0000-0000-000000000001.lock.json")
    );
    assert_eq!(lock.runtime, "13.0");
    assert_eq!(lock.feeds, feeds());
    assert_eq!(lock.packages.len(), 3);
    assert_eq!(lock.packages[TOOLS], "2.1.0.0");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn raised_minimum_invalidates_processed_package() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let manifest = lib_and_addon_manifest();
    seed_lock(&cache, &manifest, LIB, "1.0.0.0", &[]);

    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[]);
    feed.publish(LIB, "1.1.0.0", &[]);
    feed.publish(ADDON, "1.0.0.0", &[(LIB, "1.1.0.0")]);

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert_eq!(report.processing_log, vec![LIB, ADDON, LIB]);
    assert_eq!(
        versions_of(&report),
        pairs(&[(ADDON, "1.0.0.0"), (LIB, "1.1.0.0")])
    );
    assert_eq!(
        feed.downloads,
        vec![format!("{ADDON} 1.0.0.0"), format!("{LIB} 1.1.0.0")]
    );
    assert!(report.conflicts.is_empty());
    assert_eq!(report.artifacts[LIB], root.join("Contoso.Lib.1.1.0.0.app"));

    let lock = lock_store(&cache, &manifest).load().expect("lock must exist");
    assert_eq!(lock.packages[LIB], "1.1.0.0");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn shortfall_is_recorded_without_lowering_the_minimum() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(TOOLS, "2.0.0.0")]);
    feed.publish(ADDON, "1.0.0.0", &[(TOOLS, "1.0.0.0")]);
    feed.publish(TOOLS, "1.5.0.0", &[]);
    let manifest = lib_and_addon_manifest();

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed)
        .expect("a shortfall must not abort the run");

    assert_eq!(
        report.conflicts,
        vec![VersionConflict {
            package_id: TOOLS.to_string(),
            requested: Version::parse("2.0.0.0"),
            resolved: Version::parse("1.5.0.0"),
            best_available: Version::parse("1.5.0.0"),
        }]
    );
    assert_eq!(report.processing_log, vec![LIB, ADDON, TOOLS]);

    let lock = lock_store(&cache, &manifest)
        .load()
        .expect("lock must be written despite the conflict");
    assert_eq!(lock.packages[TOOLS], "1.5.0.0");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn package_missing_from_every_feed_is_fatal() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(TOOLS, "1.0.0.0")]);
    let manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    let err = resolve_symbols(&manifest, &feeds(), &cache, &mut feed)
        .expect_err("missing package must abort");

    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::PackageNotFound { package_id, feeds }) => {
            assert_eq!(package_id, TOOLS);
            assert_eq!(feeds, &vec![FEED.to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(lock_store(&cache, &manifest).load().is_none());
    assert!(!lock_store(&cache, &manifest).path().exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn feed_failure_aborts_and_keeps_previous_lock() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let manifest = lib_and_addon_manifest();
    seed_lock(&cache, &manifest, LIB, "1.0.0.0", &[]);
    let before = fs::read_to_string(lock_store(&cache, &manifest).path())
        .expect("seeded lock must exist");

    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[]);
    feed.publish(ADDON, "1.0.0.0", &[]);
    feed.failing = Some(ADDON.to_string());

    let err = resolve_symbols(&manifest, &feeds(), &cache, &mut feed)
        .expect_err("feed failure must abort");

    assert!(matches!(
        err.downcast_ref::<FeedError>(),
        Some(FeedError::Status { status: 503, .. })
    ));
    assert!(format!("{err:#}").contains(ADDON));
    assert_eq!(
        fs::read_to_string(lock_store(&cache, &manifest).path()).expect("lock must survive"),
        before
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn second_run_reuses_lock_without_network() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(PLATFORM, "24.0.0.0", &[]);
    feed.publish(LIB, "1.0.0.0", &[(TOOLS, "1.0.0.0")]);
    feed.publish(TOOLS, "1.0.0.0", &[]);
    let manifest = manifest(
        Some("24.0.0.0"),
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    let first = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("first run");
    let mut first_lock = lock_store(&cache, &manifest).load().expect("first lock");
    feed.reset_calls();

    let second = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("second run");
    let mut second_lock = lock_store(&cache, &manifest).load().expect("second lock");

    assert!(feed.list_calls.is_empty());
    assert!(feed.downloads.is_empty());
    assert_eq!(second.downloads, 0);
    assert_eq!(second.feed_queries, 0);
    assert!(second.reused_lock);
    assert_eq!(versions_of(&first), versions_of(&second));
    assert_eq!(first.artifacts, second.artifacts);

    first_lock.updated_at_unix = 0;
    second_lock.updated_at_unix = 0;
    assert_eq!(
        serde_json::to_string_pretty(&first_lock).expect("must serialize"),
        serde_json::to_string_pretty(&second_lock).expect("must serialize")
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn runtime_change_ignores_lock_but_reuses_cached_artifacts() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(TOOLS, "1.0.0.0")]);
    feed.publish(TOOLS, "1.0.0.0", &[]);
    let mut manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("first run");
    feed.reset_calls();
    manifest.runtime = Some("14.0".to_string());

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("second run");

    assert!(!report.reused_lock);
    assert_eq!(feed.list_calls, vec![LIB, TOOLS]);
    assert!(feed.downloads.is_empty());
    let lock = lock_store(&cache, &manifest).load().expect("lock must exist");
    assert_eq!(lock.runtime, "14.0");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn cyclic_dependencies_terminate() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(ADDON, "1.0.0.0")]);
    feed.publish(ADDON, "1.0.0.0", &[(LIB, "1.0.0.0"), (ADDON, "9.0.0.0")]);
    let manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert_eq!(
        versions_of(&report),
        pairs(&[(ADDON, "1.0.0.0"), (LIB, "1.0.0.0")])
    );
    assert_eq!(report.processing_log, vec![LIB, ADDON, ADDON]);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].package_id, ADDON);
    assert_eq!(report.conflicts[0].requested, Version::parse("9.0.0.0"));
    assert_eq!(feed.list_calls.len(), 2);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn packages_only_reachable_through_invalidated_versions_are_pruned() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let manifest = lib_and_addon_manifest();
    seed_lock(
        &cache,
        &manifest,
        LIB,
        "1.0.0.0",
        &[Requirement::at_least(LEGACY, "1.0.0.0")],
    );

    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(LEGACY, "1.0.0.0")]);
    feed.publish(LIB, "1.1.0.0", &[]);
    feed.publish(ADDON, "1.0.0.0", &[(LIB, "1.1.0.0")]);
    feed.publish(LEGACY, "1.0.0.0", &[]);

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert_eq!(report.processing_log, vec![LIB, ADDON, LEGACY, LIB]);
    assert_eq!(
        versions_of(&report),
        pairs(&[(ADDON, "1.0.0.0"), (LIB, "1.1.0.0")])
    );
    assert!(!report.artifacts.contains_key(LEGACY));
    let lock = lock_store(&cache, &manifest).load().expect("lock must exist");
    assert!(!lock.packages.contains_key(LEGACY));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn legacy_unversioned_artifact_satisfies_lock() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );
    seed_lock(&cache, &manifest, LIB, "1.0.0.0", &[]);
    let version = Version::parse("1.0.0.0");
    fs::remove_file(cache.artifact_path(LIB, &version)).expect("must drop versioned artifact");
    fs::write(cache.legacy_artifact_path(LIB), b"legacy").expect("must write legacy artifact");

    let mut feed = FakeFeed::default();
    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert!(feed.list_calls.is_empty());
    assert!(feed.downloads.is_empty());
    assert_eq!(report.artifacts[LIB], root.join("Contoso.Lib.app"));
    assert_eq!(versions_of(&report), pairs(&[(LIB, "1.0.0.0")]));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn locked_package_without_dependency_list_is_fetched_once_at_locked_version() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );
    seed_lock(&cache, &manifest, LIB, "1.0.0.0", &[]);
    fs::remove_file(cache.dependencies_path(LIB, &Version::parse("1.0.0.0")))
        .expect("must drop dependency list");

    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(TOOLS, "1.0.0.0")]);
    feed.publish(LIB, "1.2.0.0", &[]);
    feed.publish(TOOLS, "1.0.0.0", &[]);

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert_eq!(
        feed.downloads,
        vec![format!("{LIB} 1.0.0.0"), format!("{TOOLS} 1.0.0.0")]
    );
    assert_eq!(
        versions_of(&report),
        pairs(&[(LIB, "1.0.0.0"), (TOOLS, "1.0.0.0")])
    );
    assert_eq!(
        report.packages[LIB].max_available_version,
        Some(Version::parse("1.2.0.0"))
    );
    assert_eq!(
        cache
            .read_dependencies(LIB, &Version::parse("1.0.0.0"))
            .map(|cached| cached.dependencies),
        Some(vec![Requirement::at_least(TOOLS, "1.0.0.0")])
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_descriptor_is_a_warning_and_a_leaf() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish_package(
        LIB,
        FakePackage {
            version: "1.0.0.0".to_string(),
            dependencies: Vec::new(),
            descriptor: false,
            artifact: true,
        },
    );
    let manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    let report = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must resolve");

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("no dependency descriptor"));
    assert!(report.packages[LIB].dependencies.is_empty());
    let cached = cache
        .read_dependencies(LIB, &Version::parse("1.0.0.0"))
        .expect("must cache an empty dependency list");
    assert!(cached.dependencies.is_empty());
    assert!(cached.warning.is_some());

    feed.reset_calls();
    let rerun = resolve_symbols(&manifest, &feeds(), &cache, &mut feed).expect("must rerun");

    assert!(rerun.reused_lock);
    assert!(feed.downloads.is_empty());
    assert_eq!(rerun.downloads, 0);
    assert_eq!(rerun.warnings, report.warnings);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn archive_without_artifact_is_fatal() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish_package(
        LIB,
        FakePackage {
            version: "1.0.0.0".to_string(),
            dependencies: Vec::new(),
            descriptor: true,
            artifact: false,
        },
    );
    let manifest = manifest(
        None,
        &[("Lib", "11111111-1111-1111-1111-111111111111", "1.0.0.0")],
    );

    let err = resolve_symbols(&manifest, &feeds(), &cache, &mut feed)
        .expect_err("missing artifact must abort");

    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::ArtifactMissing { .. })
    ));
    assert!(!lock_store(&cache, &manifest).path().exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn session_memoizes_version_queries() {
    let root = test_cache_root();
    let cache = PackageCache::new(&root);
    let mut feed = FakeFeed::default();
    feed.publish(LIB, "1.0.0.0", &[(TOOLS, "1.0.0.0")]);
    feed.publish(ADDON, "1.0.0.0", &[(TOOLS, "1.1.0.0")]);
    feed.publish(TOOLS, "1.0.0.0", &[]);
    feed.publish(TOOLS, "1.1.0.0", &[]);
    let roots = vec![
        Requirement::at_least(LIB, "1.0.0.0"),
        Requirement::at_least(ADDON, "1.0.0.0"),
    ];
    let feeds = feeds();

    let mut session = MetadataCache::new();
    let resolution = Resolver::new(&mut feed, &cache, &feeds, &mut session)
        .resolve(&roots)
        .expect("must resolve");

    assert_eq!(resolution.feed_queries, 3);
    assert_eq!(resolution.locked_packages()[TOOLS], "1.1.0.0");
    assert!(session.versions(TOOLS).flatten().is_some());
    assert_eq!(
        session.dependencies(LIB, &Version::parse("1.0.0.0")),
        Some(&[Requirement::at_least(TOOLS, "1.0.0.0")][..])
    );
    assert_eq!(feed.list_calls, vec![LIB, ADDON, TOOLS]);

    let _ = fs::remove_dir_all(&root);
}

static TEST_CACHE_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_cache_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_CACHE_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "symbolpack-resolver-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
