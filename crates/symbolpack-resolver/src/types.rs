use std::collections::BTreeMap;
use std::path::PathBuf;

use symbolpack_core::{ResolvedPackage, Version};

/// A package whose feeds could not satisfy the demanded minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub package_id: String,
    pub requested: Version,
    pub resolved: Version,
    pub best_available: Version,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub packages: BTreeMap<String, ResolvedPackage>,
    pub artifacts: BTreeMap<String, PathBuf>,
    pub conflicts: Vec<VersionConflict>,
    pub warnings: Vec<String>,
    pub downloads: usize,
    pub feed_queries: usize,
    /// Package ids in the order the worklist handled them.
    pub processing_log: Vec<String>,
}

impl Resolution {
    /// Package id to version, as recorded in the lock file.
    pub fn locked_packages(&self) -> BTreeMap<String, String> {
        self.packages
            .values()
            .map(|package| (package.package_id.clone(), package.version.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ResolutionReport {
    pub packages: BTreeMap<String, ResolvedPackage>,
    pub artifacts: BTreeMap<String, PathBuf>,
    pub conflicts: Vec<VersionConflict>,
    pub warnings: Vec<String>,
    pub downloads: usize,
    pub feed_queries: usize,
    pub lock_path: PathBuf,
    /// Whether a lock file with a matching runtime seeded this run.
    pub reused_lock: bool,
    pub processing_log: Vec<String>,
}
