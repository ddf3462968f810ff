use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_FEEDS: &[&str] = &[
    "https://dynamicssmb2.pkgs.visualstudio.com/DynamicsBCPublicFeeds/_packaging/MSSymbols/nuget/v3",
    "https://dynamicssmb2.pkgs.visualstudio.com/DynamicsBCPublicFeeds/_packaging/AppSourceSymbols/nuget/v3",
];

pub fn default_feeds() -> Vec<String> {
    DEFAULT_FEEDS.iter().map(|feed| feed.to_string()).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolpackConfig {
    #[serde(default)]
    pub feeds: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
}

impl SymbolpackConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("failed to parse symbolpack config")
    }

    /// Loads `path` when it exists; a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed parsing config: {}", path.display()))
    }

    /// Feed order: explicit overrides, then configured feeds, then the
    /// built-in public symbol feeds.
    pub fn effective_feeds(&self, overrides: &[String]) -> Vec<String> {
        let feeds = if !overrides.is_empty() {
            overrides.to_vec()
        } else if !self.feeds.is_empty() {
            self.feeds.clone()
        } else {
            default_feeds()
        };
        feeds
            .into_iter()
            .map(|feed| feed.trim().trim_end_matches('/').to_string())
            .filter(|feed| !feed.is_empty())
            .collect()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}
