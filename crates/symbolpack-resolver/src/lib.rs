mod error;
mod prune;
mod resolve;
mod session;
mod types;

use anyhow::Result;
use symbolpack_cache::{LockFile, LockStore, PackageCache};
use symbolpack_core::AppManifest;
use symbolpack_feed::PackageFeed;
use tracing::info;

pub use error::ResolveError;
pub use resolve::Resolver;
pub use session::MetadataCache;
pub use types::{Resolution, ResolutionReport, VersionConflict};

/// Resolves every symbol package an application needs into `cache` and
/// rewrites the application's lock file. The lock file is only written when
/// the whole run succeeds.
pub fn resolve_symbols<F: PackageFeed>(
    manifest: &AppManifest,
    feeds: &[String],
    cache: &PackageCache,
    feed: &mut F,
) -> Result<ResolutionReport> {
    cache.ensure_root()?;
    let store = LockStore::new(cache.lock_path(&manifest.publisher, &manifest.name, &manifest.id));
    let lock = match store.load() {
        Some(lock) if lock.matches_runtime(manifest.runtime()) => Some(lock),
        Some(lock) => {
            info!(
                locked = lock.runtime.as_str(),
                current = manifest.runtime(),
                "runtime changed; ignoring lock file"
            );
            None
        }
        None => None,
    };

    let mut session = MetadataCache::new();
    let resolution = Resolver::new(feed, cache, feeds, &mut session)
        .with_lock(lock.as_ref())
        .resolve(&manifest.root_requirements())?;

    let lock_file = LockFile::for_manifest(manifest, resolution.locked_packages(), feeds.to_vec());
    store.save(&lock_file)?;
    info!(
        path = %store.path().display(),
        packages = resolution.packages.len(),
        downloads = resolution.downloads,
        "lock file written"
    );

    Ok(ResolutionReport {
        packages: resolution.packages,
        artifacts: resolution.artifacts,
        conflicts: resolution.conflicts,
        warnings: resolution.warnings,
        downloads: resolution.downloads,
        feed_queries: resolution.feed_queries,
        lock_path: store.path().to_path_buf(),
        reused_lock: lock.is_some(),
        processing_log: resolution.processing_log,
    })
}

#[cfg(test)]
mod tests;
