use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("package '{package_id}' was not found on any feed ({})", .feeds.join(", "))]
    PackageNotFound {
        package_id: String,
        feeds: Vec<String>,
    },

    #[error("archive for '{package_id}' {version} carries no symbol artifact")]
    ArtifactMissing { package_id: String, version: String },
}
