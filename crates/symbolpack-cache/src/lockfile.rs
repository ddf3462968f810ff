use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use symbolpack_core::{AppManifest, Version};
use tracing::{debug, warn};

use crate::fs_ops::{current_unix_timestamp, write_atomic};

/// Record of the last completed resolution for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    #[serde(default = "lock_file_version")]
    pub version: u32,
    #[serde(default)]
    pub runtime: String,
    pub application_version: Option<String>,
    pub platform_version: Option<String>,
    pub app_id: String,
    pub app_name: String,
    pub publisher: String,
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub updated_at_unix: u64,
}

impl LockFile {
    pub fn for_manifest(
        manifest: &AppManifest,
        packages: BTreeMap<String, String>,
        feeds: Vec<String>,
    ) -> Self {
        Self {
            version: lock_file_version(),
            runtime: manifest.runtime().to_string(),
            application_version: manifest.application.clone(),
            platform_version: manifest.platform.clone(),
            app_id: manifest.id.clone(),
            app_name: manifest.name.clone(),
            publisher: manifest.publisher.clone(),
            packages,
            feeds,
            updated_at_unix: current_unix_timestamp(),
        }
    }

    pub fn matches_runtime(&self, runtime: &str) -> bool {
        self.runtime == runtime
    }

    pub fn locked_version(&self, package_id: &str) -> Option<Version> {
        self.packages
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(package_id))
            .map(|(_, version)| Version::parse(version))
    }
}

fn lock_file_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable lock files count as "no prior state".
    pub fn load(&self) -> Option<LockFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no lock file");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring unreadable lock file: {err}");
                return None;
            }
        };

        match serde_json::from_str::<LockFile>(&content) {
            Ok(lock) => Some(lock),
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring malformed lock file: {err}");
                None
            }
        }
    }

    pub fn save(&self, lock: &LockFile) -> Result<()> {
        let mut content = serde_json::to_string_pretty(lock)
            .with_context(|| format!("failed serializing lock file {}", self.path.display()))?;
        content.push('\n');
        write_atomic(&self.path, content.as_bytes())
            .with_context(|| format!("failed writing lock file {}", self.path.display()))
    }
}
