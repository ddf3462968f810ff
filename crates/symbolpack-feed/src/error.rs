use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request for '{package_id}' to {feed} failed: {source}")]
    Transport {
        package_id: String,
        feed: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("feed {feed} answered HTTP {status} for '{package_id}'")]
    Status {
        package_id: String,
        feed: String,
        status: u16,
    },

    #[error("feed {feed} returned an unreadable version index for '{package_id}': {reason}")]
    InvalidIndex {
        package_id: String,
        feed: String,
        reason: String,
    },

    #[error("download of '{package_id}' {version} from {feed} produced an empty file")]
    EmptyDownload {
        package_id: String,
        feed: String,
        version: String,
    },
}
