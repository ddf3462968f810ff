mod app_manifest;
mod config;
mod naming;
mod requirement;
mod version;

pub use app_manifest::{
    dependency_package_id, AppDependency, AppManifest, PLATFORM_APPLICATION_PACKAGE_ID,
};
pub use config::{default_feeds, SymbolpackConfig, DEFAULT_TIMEOUT_SECS};
pub use naming::{
    artifact_file_name, clean_package_id, dependencies_file_name, legacy_artifact_file_name,
    sanitize_path_segment, ARTIFACT_EXTENSION, DEPENDENCIES_EXTENSION, DESCRIPTOR_EXTENSION,
};
pub use requirement::{merge_requirements, Requirement, ResolvedPackage};
pub use version::{compare, highest_version, select_version, Version, VersionSelection};
