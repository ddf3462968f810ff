mod archive;
mod client;
mod descriptor;
mod error;

use std::path::{Path, PathBuf};

use anyhow::Result;
use symbolpack_core::Version;

pub use archive::{extract_artifact, read_dependencies, DependencyScan};
pub use client::{archive_url, index_url, HttpFeed};
pub use descriptor::{
    range_lower_bound, DependencyEntry, DependencyGroup, DependencyLayout, DescriptorSchema,
    NuspecDocument,
};
pub use error::FeedError;

/// Versions of one package as reported by the first feed that knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedVersionIndex {
    pub feed: String,
    pub versions: Vec<Version>,
}

/// Source of package version lists and archives.
pub trait PackageFeed {
    /// Queries `feeds` in order and returns the first non-empty version list.
    /// `Ok(None)` means no feed carries the package; transport problems are
    /// errors.
    fn list_versions(&mut self, package_id: &str, feeds: &[String])
        -> Result<Option<FeedVersionIndex>>;

    /// Downloads one archive into `destination_dir` and returns its path.
    fn download_archive(
        &mut self,
        feed: &str,
        package_id: &str,
        version: &Version,
        destination_dir: &Path,
    ) -> Result<PathBuf>;
}
