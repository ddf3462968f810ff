use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use symbolpack_core::Version;
use tracing::{debug, info};

use crate::{FeedError, FeedVersionIndex, PackageFeed};

#[derive(Debug, Deserialize)]
struct FlatContainerIndex {
    #[serde(default)]
    versions: Vec<String>,
}

pub fn index_url(feed: &str, package_id: &str) -> String {
    format!(
        "{}/flat2/{}/index.json",
        feed.trim_end_matches('/'),
        package_id.to_ascii_lowercase()
    )
}

pub fn archive_url(feed: &str, package_id: &str, version: &str) -> String {
    let id = package_id.to_ascii_lowercase();
    let version = version.to_ascii_lowercase();
    format!(
        "{}/flat2/{id}/{version}/{id}.{version}.nupkg",
        feed.trim_end_matches('/')
    )
}

/// NuGet flat-container client over blocking HTTP.
pub struct HttpFeed {
    client: Client,
}

impl HttpFeed {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { client })
    }

    fn query_feed(&self, feed: &str, package_id: &str) -> Result<Vec<Version>> {
        let url = index_url(feed, package_id);
        debug!(package = package_id, %url, "querying feed");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| FeedError::Transport {
                package_id: package_id.to_string(),
                feed: feed.to_string(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(FeedError::Status {
                package_id: package_id.to_string(),
                feed: feed.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let body = response.text().map_err(|source| FeedError::Transport {
            package_id: package_id.to_string(),
            feed: feed.to_string(),
            source,
        })?;
        let index: FlatContainerIndex =
            serde_json::from_str(&body).map_err(|err| FeedError::InvalidIndex {
                package_id: package_id.to_string(),
                feed: feed.to_string(),
                reason: err.to_string(),
            })?;

        Ok(index
            .versions
            .iter()
            .map(|version| version.trim())
            .filter(|version| !version.is_empty())
            .map(Version::parse)
            .collect())
    }
}

impl PackageFeed for HttpFeed {
    fn list_versions(
        &mut self,
        package_id: &str,
        feeds: &[String],
    ) -> Result<Option<FeedVersionIndex>> {
        for feed in feeds {
            let versions = self.query_feed(feed, package_id)?;
            if versions.is_empty() {
                debug!(package = package_id, feed = feed.as_str(), "package not on feed");
                continue;
            }
            return Ok(Some(FeedVersionIndex {
                feed: feed.clone(),
                versions,
            }));
        }
        Ok(None)
    }

    fn download_archive(
        &mut self,
        feed: &str,
        package_id: &str,
        version: &Version,
        destination_dir: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(destination_dir).with_context(|| {
            format!(
                "failed to create download dir: {}",
                destination_dir.display()
            )
        })?;

        let url = archive_url(feed, package_id, version.as_str());
        let file_name = format!(
            "{}.{}.nupkg",
            package_id.to_ascii_lowercase(),
            version.as_str().to_ascii_lowercase()
        );
        let archive_path = destination_dir.join(&file_name);
        let part_path = destination_dir.join(format!("{file_name}.part"));
        info!(package = package_id, %version, %url, "downloading archive");

        let transport = |source: reqwest::Error| FeedError::Transport {
            package_id: package_id.to_string(),
            feed: feed.to_string(),
            source,
        };
        let mut response = self.client.get(&url).send().map_err(transport)?;
        if !response.status().is_success() {
            return Err(FeedError::Status {
                package_id: package_id.to_string(),
                feed: feed.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let mut file = File::create(&part_path)
            .with_context(|| format!("failed to create {}", part_path.display()))?;
        let written = match response.copy_to(&mut file) {
            Ok(written) => written,
            Err(source) => {
                drop(file);
                let _ = fs::remove_file(&part_path);
                return Err(transport(source).into());
            }
        };
        drop(file);

        if written == 0 {
            let _ = fs::remove_file(&part_path);
            return Err(FeedError::EmptyDownload {
                package_id: package_id.to_string(),
                feed: feed.to_string(),
                version: version.to_string(),
            }
            .into());
        }

        fs::rename(&part_path, &archive_path).with_context(|| {
            format!(
                "failed to move downloaded archive into place: {}",
                archive_path.display()
            )
        })?;
        debug!(package = package_id, bytes = written, "archive downloaded");
        Ok(archive_path)
    }
}
