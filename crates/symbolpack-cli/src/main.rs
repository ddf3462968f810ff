mod render;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use symbolpack_cache::{LockStore, PackageCache};
use symbolpack_core::AppManifest;
use symbolpack_feed::HttpFeed;
use symbolpack_resolver::resolve_symbols;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::render::{format_doctor_lines, format_lock_lines, format_report_lines};
use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "symbolpack")]
#[command(about = "Resolve and cache symbol packages for an application", long_about = None)]
struct Cli {
    /// Cache directory; overrides SYMBOLPACK_CACHE_DIR and the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// TOML config file; defaults to config.toml in the cache directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve every symbol package the application depends on.
    Resolve {
        #[arg(long, default_value = "app.json")]
        manifest: PathBuf,
        /// Feed URL to query, in order. Repeatable.
        #[arg(long = "feed")]
        feeds: Vec<String>,
    },
    /// Print the lock file recorded for an application.
    ShowLock {
        #[arg(long, default_value = "app.json")]
        manifest: PathBuf,
    },
    /// Print the effective cache directory and feeds.
    Doctor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run_cli(cli)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_cli(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.cache_dir.as_deref(), cli.config.as_deref())?;
    debug!(cache = %settings.cache_root.display(), "settings loaded");

    match cli.command {
        Commands::Resolve { manifest, feeds } => {
            let manifest = AppManifest::load(&manifest)?;
            let feeds = settings.config.effective_feeds(&feeds);
            let cache = PackageCache::new(&settings.cache_root);
            let mut feed = HttpFeed::new(Duration::from_secs(settings.config.timeout_secs()))?;

            let report = resolve_symbols(&manifest, &feeds, &cache, &mut feed)?;
            for line in format_report_lines(&report) {
                println!("{line}");
            }
        }
        Commands::ShowLock { manifest } => {
            let manifest = AppManifest::load(&manifest)?;
            let cache = PackageCache::new(&settings.cache_root);
            let store = LockStore::new(cache.lock_path(
                &manifest.publisher,
                &manifest.name,
                &manifest.id,
            ));
            let lock = store.load().ok_or_else(|| {
                anyhow!(
                    "no lock file for '{}' at {}",
                    manifest.name,
                    store.path().display()
                )
            })?;
            for line in format_lock_lines(&lock, store.path()) {
                println!("{line}");
            }
        }
        Commands::Doctor => {
            for line in format_doctor_lines(&settings) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
