use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use symbolpack_cache::{default_cache_root, CACHE_DIR_ENV};
use symbolpack_core::SymbolpackConfig;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) cache_root: PathBuf,
    pub(crate) config_path: PathBuf,
    pub(crate) config: SymbolpackConfig,
}

impl Settings {
    /// Cache root precedence: `--cache-dir`, then `SYMBOLPACK_CACHE_DIR`, then
    /// `cache_dir` from the config file, then the per-user default. An
    /// explicit `--config` must exist.
    pub(crate) fn load(cache_dir: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        let env_cache_dir = std::env::var_os(CACHE_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::from_sources(cache_dir, env_cache_dir.as_deref(), config_path)
    }

    pub(crate) fn from_sources(
        cache_dir: Option<&Path>,
        env_cache_dir: Option<&Path>,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let override_dir = cache_dir.or(env_cache_dir);
        let (config_path, config) = match config_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(anyhow!("config file not found: {}", path.display()));
                }
                (path.to_path_buf(), SymbolpackConfig::load_or_default(path)?)
            }
            None => {
                let base = match override_dir {
                    Some(dir) => dir.to_path_buf(),
                    None => default_cache_root()?,
                };
                let path = base.join(CONFIG_FILE_NAME);
                let config = SymbolpackConfig::load_or_default(&path)?;
                (path, config)
            }
        };

        let cache_root = match (override_dir, &config.cache_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => default_cache_root()?,
        };

        Ok(Self {
            cache_root,
            config_path,
            config,
        })
    }
}
