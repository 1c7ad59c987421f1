use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dtnpool_config::DtnPoolConfig;
use dtnpool_telemetry::PoolLogger;

use crate::soak;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/dtnpool.yaml plus the
    /// DTNPOOL_ENV overlay.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push bundles through flows with worker threads and report pool stats
    Soak(SoakArgs),
    /// Print the effective configuration as YAML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct SoakArgs {
    /// Number of flows bundles are spread across
    #[arg(long, default_value_t = 8)]
    pub flows: usize,
    /// Total bundles to produce
    #[arg(long, default_value_t = 100_000)]
    pub bundles: u64,
    /// Worker threads; overrides `workers.threads`
    #[arg(long)]
    pub workers: Option<usize>,
    /// Largest payload in bytes
    #[arg(long, default_value_t = 512)]
    pub max_payload: usize,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DtnPoolConfig> {
    let config = match path {
        Some(path) => DtnPoolConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DtnPoolConfig::load().context("loading configuration")?,
    };
    Ok(config)
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Soak(args) => {
            PoolLogger::init(&config.telemetry)?;
            if let Some(workers) = args.workers {
                config.workers.threads = workers.max(1);
            }
            let report = soak::run(&config, &args).await?;
            PoolLogger::log_stats("soak", &report.stats);
            print!("{}", serde_yaml::to_string(&report)?);
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(())
}
