//! Bughunter CLI
//!
//! Command-line interface for submitting repositories to the Bughunter
//! orchestrator and following jobs to completion.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bughunter")]
#[command(about = "Automated lint and test remediation for JavaScript repositories", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "BUGHUNTER_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Seconds between status polls while waiting for a job
    #[arg(long, default_value_t = 1)]
    interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server,
        poll_interval: Duration::from_secs(cli.interval.max(1)),
    };

    handle_command(cli.command, &config).await
}
