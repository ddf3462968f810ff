use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use symbolpack_cache::{CachedDependencies, LockFile, PackageCache};
use symbolpack_core::{highest_version, select_version, Requirement, ResolvedPackage, Version};
use symbolpack_feed::{extract_artifact, read_dependencies, FeedVersionIndex, PackageFeed};
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::prune::reachable_packages;
use crate::session::MetadataCache;
use crate::types::{Resolution, VersionConflict};

/// Resolution state keyed by lower-cased package id. `required` keeps the
/// first-seen spelling of each id alongside its highest minimum.
#[derive(Default)]
struct Worklist {
    required: HashMap<String, Requirement>,
    processed: HashMap<String, ResolvedPackage>,
    artifacts: HashMap<String, PathBuf>,
    conflicts: HashMap<String, VersionConflict>,
    pending: VecDeque<String>,
    queued: HashSet<String>,
}

impl Worklist {
    fn enqueue(&mut self, key: &str) {
        if self.queued.insert(key.to_string()) {
            self.pending.push_back(key.to_string());
        }
    }

    fn pop(&mut self) -> Option<String> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        Some(key)
    }

    /// Records a demand for a package. Returns its key and whether the
    /// required minimum was set or raised.
    fn demand(&mut self, requirement: &Requirement) -> (String, bool) {
        let key = requirement.package_id.to_ascii_lowercase();
        let changed = match self.required.get_mut(&key) {
            Some(existing) => existing.raise(requirement.minimum.as_ref()),
            None => {
                self.required.insert(key.clone(), requirement.clone());
                true
            }
        };
        (key, changed)
    }

    fn invalidate(&mut self, key: &str) {
        self.processed.remove(key);
        self.artifacts.remove(key);
        self.conflicts.remove(key);
        self.enqueue(key);
    }
}

struct Outcome {
    package: ResolvedPackage,
    artifact: PathBuf,
    conflict: Option<VersionConflict>,
}

/// Worklist resolver over one feed transport and one package cache.
pub struct Resolver<'a, F: PackageFeed> {
    feed: &'a mut F,
    cache: &'a PackageCache,
    feeds: &'a [String],
    session: &'a mut MetadataCache,
    lock: Option<&'a LockFile>,
}

impl<'a, F: PackageFeed> Resolver<'a, F> {
    pub fn new(
        feed: &'a mut F,
        cache: &'a PackageCache,
        feeds: &'a [String],
        session: &'a mut MetadataCache,
    ) -> Self {
        Self {
            feed,
            cache,
            feeds,
            session,
            lock: None,
        }
    }

    /// Seeds the run with a previous lock file. The caller is responsible for
    /// only passing a lock whose runtime matches the current manifest.
    pub fn with_lock(mut self, lock: Option<&'a LockFile>) -> Self {
        self.lock = lock;
        self
    }

    pub fn resolve(mut self, roots: &[Requirement]) -> Result<Resolution> {
        let mut work = Worklist::default();
        let mut resolution = Resolution::default();

        let mut root_keys = Vec::with_capacity(roots.len());
        for root in roots {
            let (key, _) = work.demand(root);
            work.enqueue(&key);
            root_keys.push(key);
        }

        while let Some(key) = work.pop() {
            let Some(requirement) = work.required.get(&key).cloned() else {
                continue;
            };
            resolution
                .processing_log
                .push(requirement.package_id.clone());

            if let Some(done) = work.processed.get(&key) {
                if satisfies(&done.version, requirement.minimum.as_ref()) {
                    debug!(
                        package = requirement.package_id.as_str(),
                        version = %done.version,
                        "already resolved"
                    );
                    continue;
                }
            }

            let outcome = match self.adopt_locked(&requirement, &mut resolution)? {
                Some(outcome) => outcome,
                None => self.select_and_fetch(&requirement, &mut resolution)?,
            };

            match outcome.conflict {
                Some(conflict) => {
                    warn!(
                        package = conflict.package_id.as_str(),
                        requested = %conflict.requested,
                        resolved = %conflict.resolved,
                        "no available version satisfies the required minimum"
                    );
                    work.conflicts.insert(key.clone(), conflict);
                }
                None => {
                    work.conflicts.remove(&key);
                }
            }

            let dependencies = outcome.package.dependencies.clone();
            work.artifacts.insert(key.clone(), outcome.artifact);
            work.processed.insert(key.clone(), outcome.package);

            for dependency in &dependencies {
                let (dependency_key, raised) = work.demand(dependency);
                let stale = match work.processed.get(&dependency_key) {
                    Some(done) => {
                        raised
                            && !satisfies(
                                &done.version,
                                work.required
                                    .get(&dependency_key)
                                    .and_then(|required| required.minimum.as_ref()),
                            )
                    }
                    None => {
                        work.enqueue(&dependency_key);
                        false
                    }
                };
                if stale {
                    info!(
                        package = dependency.package_id.as_str(),
                        required_by = requirement.package_id.as_str(),
                        "minimum raised above resolved version; re-resolving"
                    );
                    work.invalidate(&dependency_key);
                }
            }
        }

        let reachable = reachable_packages(&root_keys, &work.processed);
        for key in &reachable {
            let (Some(package), Some(artifact)) =
                (work.processed.remove(key), work.artifacts.remove(key))
            else {
                continue;
            };
            resolution
                .artifacts
                .insert(package.package_id.clone(), artifact);
            resolution
                .packages
                .insert(package.package_id.clone(), package);
            if let Some(conflict) = work.conflicts.remove(key) {
                resolution.conflicts.push(conflict);
            }
        }
        for orphan in work.processed.values() {
            debug!(package = orphan.package_id.as_str(), "dropping unreachable package");
        }
        resolution
            .conflicts
            .sort_by(|left, right| left.package_id.cmp(&right.package_id));

        Ok(resolution)
    }

    /// Lock fast path: the locked version is reused when it still meets the
    /// minimum and its artifact is in the cache.
    fn adopt_locked(
        &mut self,
        requirement: &Requirement,
        resolution: &mut Resolution,
    ) -> Result<Option<Outcome>> {
        let Some(lock) = self.lock else {
            return Ok(None);
        };
        let package_id = requirement.package_id.as_str();
        let Some(version) = lock.locked_version(package_id) else {
            return Ok(None);
        };
        if !satisfies(&version, requirement.minimum.as_ref()) {
            debug!(
                package = package_id,
                locked = %version,
                "locked version is below the required minimum"
            );
            return Ok(None);
        }

        let mut artifact = if self.cache.has(package_id, &version) {
            self.cache.artifact_path(package_id, &version)
        } else if self.cache.has_unversioned(package_id) {
            self.cache.legacy_artifact_path(package_id)
        } else {
            return Ok(None);
        };

        let dependencies = match self.known_dependencies(package_id, &version, resolution) {
            Some(dependencies) => dependencies,
            None => {
                debug!(
                    package = package_id,
                    %version,
                    "dependency list not cached; fetching locked version"
                );
                let index = self.versions(package_id, resolution)?;
                let (fetched, dependencies) =
                    self.fetch(&index.feed, package_id, &version, resolution)?;
                artifact = fetched;
                dependencies
            }
        };

        info!(package = package_id, %version, "reusing locked version");
        Ok(Some(Outcome {
            package: ResolvedPackage {
                package_id: package_id.to_string(),
                version,
                max_available_version: self.max_available(package_id),
                dependencies,
            },
            artifact,
            conflict: None,
        }))
    }

    fn select_and_fetch(
        &mut self,
        requirement: &Requirement,
        resolution: &mut Resolution,
    ) -> Result<Outcome> {
        let package_id = requirement.package_id.as_str();
        let index = self.versions(package_id, resolution)?;
        let Some(selection) = select_version(&index.versions, requirement.minimum.as_ref()) else {
            return Err(self.not_found(package_id));
        };

        let cached = if self.cache.has(package_id, &selection.version) {
            self.known_dependencies(package_id, &selection.version, resolution)
        } else {
            None
        };
        let (artifact, dependencies) = match cached {
            Some(dependencies) => {
                debug!(
                    package = package_id,
                    version = %selection.version,
                    "artifact already cached"
                );
                (
                    self.cache.artifact_path(package_id, &selection.version),
                    dependencies,
                )
            }
            None => self.fetch(&index.feed, package_id, &selection.version, resolution)?,
        };

        let conflict = match (&requirement.minimum, selection.shortfall) {
            (Some(requested), true) => Some(VersionConflict {
                package_id: package_id.to_string(),
                requested: requested.clone(),
                resolved: selection.version.clone(),
                best_available: selection.max_available.clone(),
            }),
            _ => None,
        };

        Ok(Outcome {
            package: ResolvedPackage {
                package_id: package_id.to_string(),
                version: selection.version,
                max_available_version: Some(selection.max_available),
                dependencies,
            },
            artifact,
            conflict,
        })
    }

    /// Version index for a package, queried at most once per run.
    fn versions(
        &mut self,
        package_id: &str,
        resolution: &mut Resolution,
    ) -> Result<FeedVersionIndex> {
        let memoized = self.session.versions(package_id).map(|index| index.cloned());
        let index = match memoized {
            Some(index) => index,
            None => {
                resolution.feed_queries += 1;
                let index = self
                    .feed
                    .list_versions(package_id, self.feeds)
                    .with_context(|| format!("failed to query feeds for '{package_id}'"))?;
                self.session.record_versions(package_id, index.clone());
                index
            }
        };

        match index {
            Some(index) if !index.versions.is_empty() => Ok(index),
            _ => Err(self.not_found(package_id)),
        }
    }

    /// Dependency list from this run or from the cache sidecar. A warning
    /// stored in the sidecar is reported again.
    fn known_dependencies(
        &mut self,
        package_id: &str,
        version: &Version,
        resolution: &mut Resolution,
    ) -> Option<Vec<Requirement>> {
        if let Some(dependencies) = self.session.dependencies(package_id, version) {
            return Some(dependencies.to_vec());
        }
        let cached = self.cache.read_dependencies(package_id, version)?;
        if let Some(warning) = &cached.warning {
            note_warning(resolution, package_id, version, warning);
        }
        self.session
            .record_dependencies(package_id, version, cached.dependencies.clone());
        Some(cached.dependencies)
    }

    /// Downloads one archive, moves its artifact into the cache and records
    /// its dependency list next to it.
    fn fetch(
        &mut self,
        feed: &str,
        package_id: &str,
        version: &Version,
        resolution: &mut Resolution,
    ) -> Result<(PathBuf, Vec<Requirement>)> {
        let downloads_dir = self.cache.downloads_dir();
        let archive = self
            .feed
            .download_archive(feed, package_id, version, &downloads_dir)
            .with_context(|| format!("failed to download '{package_id}' {version} from {feed}"))?;
        resolution.downloads += 1;

        let artifact =
            match extract_artifact(&archive, package_id, version.as_str(), self.cache.root()) {
                Ok(Some(artifact)) => artifact,
                Ok(None) => {
                    discard_archive(&archive);
                    return Err(ResolveError::ArtifactMissing {
                        package_id: package_id.to_string(),
                        version: version.to_string(),
                    }
                    .into());
                }
                Err(err) => {
                    discard_archive(&archive);
                    return Err(
                        err.context(format!("failed to extract '{package_id}' {version}"))
                    );
                }
            };

        let scan = read_dependencies(&archive);
        discard_archive(&archive);
        if let Some(warning) = &scan.warning {
            note_warning(resolution, package_id, version, warning);
        }

        let record = CachedDependencies::new(scan.dependencies, scan.warning);
        self.cache.write_dependencies(package_id, version, &record)?;
        self.session
            .record_dependencies(package_id, version, record.dependencies.clone());
        info!(
            package = package_id,
            %version,
            dependencies = record.dependencies.len(),
            "cached artifact"
        );
        Ok((artifact, record.dependencies))
    }

    fn max_available(&self, package_id: &str) -> Option<Version> {
        self.session
            .versions(package_id)
            .flatten()
            .and_then(|index| highest_version(&index.versions).cloned())
    }

    fn not_found(&self, package_id: &str) -> anyhow::Error {
        ResolveError::PackageNotFound {
            package_id: package_id.to_string(),
            feeds: self.feeds.to_vec(),
        }
        .into()
    }
}

fn satisfies(version: &Version, minimum: Option<&Version>) -> bool {
    minimum.map_or(true, |minimum| version >= minimum)
}

fn note_warning(resolution: &mut Resolution, package_id: &str, version: &Version, warning: &str) {
    let message = format!("{package_id} {version}: {warning}");
    if !resolution.warnings.contains(&message) {
        resolution.warnings.push(message);
    }
}

fn discard_archive(archive: &Path) {
    if let Err(err) = fs::remove_file(archive) {
        debug!(archive = %archive.display(), "could not remove archive: {err}");
    }
}
