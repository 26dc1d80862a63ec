//! Command-line interface for the config fetcher.
//!
//! `run` performs a single cycle and is what an external scheduler (cron,
//! systemd timer) should invoke. `watch` keeps the process alive and runs a
//! cycle every `refresh_interval_secs`.

use crate::fetcher::{ConfigFetcher, LiveConfigFetcher};
use crate::mapping::KNOWN_ARTIFACTS;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use siterm_fetcher_config::{FetcherConfig, ReloadSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// siterm-config-fetcher - fetch site configuration from git and trigger reloads
#[derive(Parser)]
#[command(name = "siterm-config-fetcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: ~/.config/siterm/config-fetcher.yaml)
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set log level (overrides RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run one fetch cycle (default)
    Run,

    /// Run a fetch cycle periodically until interrupted
    Watch {
        /// Seconds between cycles (overrides `refresh_interval_secs`)
        #[arg(long, value_name = "SECONDS")]
        interval: Option<u64>,
    },

    /// Delete all cached artifacts and aliases, then run a fresh cycle
    Cleanup,

    /// Show cache paths and freshness of every known artifact
    Status,

    /// Write a starter config file
    InitConfig {
        /// Key of this host in mapping.yaml
        #[arg(long)]
        identity: String,

        /// Repository path, e.g. `sdn-sense/rm-configs`
        #[arg(long)]
        repo: String,

        /// Site frontend base URL for reload requests (disables reloads if omitted)
        #[arg(long)]
        frontend_url: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Parse arguments, initialise logging and execute the chosen command.
///
/// Returns the process exit code.
pub fn process_cli() -> i32 {
    let cli = Cli::parse();
    crate::debug::init_log_bridge(cli.log_level.map(LogLevelArg::to_level_filter));

    let config_path = cli.config.unwrap_or_else(FetcherConfig::default_path);
    let command = cli.command.unwrap_or(Commands::Run);

    match execute(command, &config_path) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("siterm-config-fetcher: error: {e:#}");
            1
        }
    }
}

fn execute(command: Commands, config_path: &Path) -> Result<i32> {
    let load = || {
        FetcherConfig::load(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    };

    match command {
        Commands::InitConfig {
            identity,
            repo,
            frontend_url,
            force,
        } => {
            init_config(config_path, identity, repo, frontend_url, force)?;
            Ok(0)
        }
        Commands::Run => {
            let fetcher = LiveConfigFetcher::from_config(load()?);
            let result = fetcher.run_cycle();
            crate::runner::log_cycle_result(&result);
            Ok(if result.is_ok() { 0 } else { 1 })
        }
        Commands::Cleanup => {
            let fetcher = LiveConfigFetcher::from_config(load()?);
            let result = fetcher.cleanup_and_refetch();
            crate::runner::log_cycle_result(&result);
            Ok(if result.is_ok() { 0 } else { 1 })
        }
        Commands::Watch { interval } => {
            let config = load()?;
            let interval =
                Duration::from_secs(interval.unwrap_or(config.refresh_interval_secs).max(1));
            let fetcher = LiveConfigFetcher::from_config(config);
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(crate::runner::watch(fetcher, interval))?;
            Ok(0)
        }
        Commands::Status => {
            let fetcher = LiveConfigFetcher::from_config(load()?);
            print_status(&fetcher);
            Ok(0)
        }
    }
}

fn init_config(
    path: &Path,
    identity: String,
    repo: String,
    frontend_url: Option<String>,
    force: bool,
) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    let reload = match frontend_url {
        Some(frontend_url) => ReloadSettings {
            frontend_url,
            ..ReloadSettings::default()
        },
        None => ReloadSettings {
            enabled: false,
            ..ReloadSettings::default()
        },
    };
    let config = FetcherConfig {
        identity,
        git_repo: repo,
        reload,
        ..FetcherConfig::default()
    };
    config.validate()?;
    config.save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_status<C, N>(fetcher: &ConfigFetcher<C, N>)
where
    C: siterm_fetcher_http::HttpClient,
    N: siterm_fetcher_http::ReloadNotifier,
{
    let cache = fetcher.cache();
    println!("Cache directory: {}", cache.dir().display());
    println!("Current bucket:  {}", cache.current_bucket());
    println!("Mapping URL:     {}", fetcher.mapping_url());
    println!();
    for name in KNOWN_ARTIFACTS {
        let resolved = cache.resolve(name);
        let alias = cache.alias_path(name);
        println!(
            "{:<12} {:<6} {}  (alias {})",
            name,
            if resolved.is_fresh { "fresh" } else { "stale" },
            resolved.path.display(),
            if alias.is_file() { "present" } else { "missing" }
        );
    }
}
