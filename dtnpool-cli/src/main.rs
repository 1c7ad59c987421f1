//! ## dtnpool-cli
//! **Operational interface for the block pool**
//!
//! `dtnpool soak` drives a multi-threaded producer/worker workload through a
//! pool and reports its counters; `dtnpool config` prints the effective
//! configuration after every layer has been applied.

use clap::Parser;

mod commands;
mod soak;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
