// wap/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug wap run ... pour voir les détails
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: ONE-OFF RUN ---
        Commands::Run { flow, workflow_id } => {
            commands::run::execute(cli.config, flow, workflow_id).await?
        }

        // --- USE CASE: CRON ---
        Commands::Schedule {
            flow,
            cron,
            no_recover,
        } => commands::schedule::execute(cli.config, flow, cron, no_recover).await?,

        // --- USE CASE: CRASH RECOVERY ---
        Commands::Resume { workflow_id } => {
            commands::resume::execute(cli.config, workflow_id).await?
        }

        // --- USE CASE: JOURNAL ---
        Commands::Status { workflow_id, limit } => {
            commands::status::execute(cli.config, workflow_id, limit)?
        }
    }

    Ok(())
}
