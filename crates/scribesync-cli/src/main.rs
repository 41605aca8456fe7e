//! ScribeSync CLI - command-line interface for the vault sync engine
//!
//! Provides commands for:
//! - Authenticating against the note server
//! - Running one-shot sync passes
//! - Viewing sync and authentication status
//! - Running the continuous watch loop

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    auth::AuthCommand, status::StatusCommand, sync::SyncCommand, watch::WatchCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "scribesync", version, about = "Sync a local document vault with a note server")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Run one full sync pass
    Sync(SyncCommand),
    /// Show sync and authentication status
    Status(StatusCommand),
    /// Watch the vault and sync changes continuously
    Watch(WatchCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Auth(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Commands::Sync(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Commands::Status(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Commands::Watch(cmd) => cmd.execute(cli.config.as_deref(), format).await,
    }
}
