mod bundle;
mod cli;
mod commands;
mod config;
mod error;
mod mcp;
mod naming;
mod pdf;
mod session;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP transport and the interactive prompts
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formsplit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mcp { session } => {
            mcp::run_server(session.into()).await?;
        }
        Commands::Label {
            path,
            export_dir,
            session,
        } => {
            // Blocking stdin reads stay off the async workers
            tokio::task::spawn_blocking(move || {
                commands::label::run(&path, session.into(), &export_dir)
            })
            .await??;
        }
        Commands::Split { path, output_dir } => {
            commands::split::run(&path, &output_dir)?;
        }
    }

    Ok(())
}
