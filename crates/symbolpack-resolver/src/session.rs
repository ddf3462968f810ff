use std::collections::HashMap;

use symbolpack_core::{Requirement, Version};
use symbolpack_feed::FeedVersionIndex;

/// Feed metadata memoized for one resolution run. Keys are package ids
/// compared case-insensitively.
#[derive(Debug, Default)]
pub struct MetadataCache {
    versions: HashMap<String, Option<FeedVersionIndex>>,
    dependencies: HashMap<(String, String), Vec<Requirement>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(None)` records that no feed carries the package.
    pub fn versions(&self, package_id: &str) -> Option<Option<&FeedVersionIndex>> {
        self.versions
            .get(&package_id.to_ascii_lowercase())
            .map(Option::as_ref)
    }

    pub fn record_versions(&mut self, package_id: &str, index: Option<FeedVersionIndex>) {
        self.versions.insert(package_id.to_ascii_lowercase(), index);
    }

    pub fn dependencies(&self, package_id: &str, version: &Version) -> Option<&[Requirement]> {
        self.dependencies
            .get(&dependency_key(package_id, version))
            .map(Vec::as_slice)
    }

    pub fn record_dependencies(
        &mut self,
        package_id: &str,
        version: &Version,
        dependencies: Vec<Requirement>,
    ) {
        self.dependencies
            .insert(dependency_key(package_id, version), dependencies);
    }
}

fn dependency_key(package_id: &str, version: &Version) -> (String, String) {
    (
        package_id.to_ascii_lowercase(),
        version.as_str().to_ascii_lowercase(),
    )
}
