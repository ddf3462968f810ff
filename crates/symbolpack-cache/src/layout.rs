use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use symbolpack_core::{
    artifact_file_name, dependencies_file_name, legacy_artifact_file_name, sanitize_path_segment,
    Requirement, Version,
};
use tracing::warn;

use crate::fs_ops::write_atomic;

pub const CACHE_DIR_ENV: &str = "SYMBOLPACK_CACHE_DIR";

/// Contents of a `.deps.json` sidecar: the dependency list read from the
/// package descriptor, and the warning raised while reading it, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDependencies {
    #[serde(default)]
    pub dependencies: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CachedDependencies {
    pub fn new(dependencies: Vec<Requirement>, warning: Option<String>) -> Self {
        Self {
            dependencies,
            warning,
        }
    }
}

// Sidecars written before warnings were recorded hold a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SidecarContent {
    Record(CachedDependencies),
    Bare(Vec<Requirement>),
}

/// On-disk symbol cache. Artifacts, their dependency lists and lock files
/// share one flat directory; archives are staged under `.downloads`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join(".downloads")
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create cache dir {}", self.root.display()))
    }

    pub fn artifact_path(&self, package_id: &str, version: &Version) -> PathBuf {
        self.root
            .join(artifact_file_name(package_id, version.as_str()))
    }

    pub fn dependencies_path(&self, package_id: &str, version: &Version) -> PathBuf {
        self.root
            .join(dependencies_file_name(package_id, version.as_str()))
    }

    pub fn legacy_artifact_path(&self, package_id: &str) -> PathBuf {
        self.root.join(legacy_artifact_file_name(package_id))
    }

    pub fn lock_path(&self, publisher: &str, name: &str, app_id: &str) -> PathBuf {
        self.root.join(format!(
            "{}_{}_{}.lock.json",
            sanitize_path_segment(publisher),
            sanitize_path_segment(name),
            sanitize_path_segment(app_id)
        ))
    }

    pub fn has(&self, package_id: &str, version: &Version) -> bool {
        self.artifact_path(package_id, version).is_file()
    }

    /// Presence check for artifacts cached before versions were part of the
    /// file name.
    pub fn has_unversioned(&self, package_id: &str) -> bool {
        self.legacy_artifact_path(package_id).is_file()
    }

    pub fn write_dependencies(
        &self,
        package_id: &str,
        version: &Version,
        record: &CachedDependencies,
    ) -> Result<PathBuf> {
        let path = self.dependencies_path(package_id, version);
        let mut content = serde_json::to_string_pretty(record).with_context(|| {
            format!("failed serializing dependencies of '{package_id}' {version}")
        })?;
        content.push('\n');
        write_atomic(&path, content.as_bytes()).with_context(|| {
            format!("failed caching dependencies of '{package_id}' {version}")
        })?;
        Ok(path)
    }

    /// Dependencies recorded when the artifact was extracted. A missing or
    /// corrupt sidecar reads as `None` so the caller falls back to the feed.
    pub fn read_dependencies(
        &self,
        package_id: &str,
        version: &Version,
    ) -> Option<CachedDependencies> {
        let path = self.dependencies_path(package_id, version);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(SidecarContent::Record(record)) => Some(record),
            Ok(SidecarContent::Bare(dependencies)) => {
                Some(CachedDependencies::new(dependencies, None))
            }
            Err(err) => {
                warn!(path = %path.display(), "ignoring malformed dependency list: {err}");
                None
            }
        }
    }
}

pub fn default_cache_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows cache root")?;
        return Ok(PathBuf::from(app_data).join("Symbolpack").join("cache"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve cache root")?;
    Ok(PathBuf::from(home).join(".symbolpack").join("cache"))
}
