//! Agora - credential and chat relay server for the community front end
//!
//! Main entry point for the Agora CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Agora - credential and chat relay server for the community front end
#[derive(Parser)]
#[command(name = "agora")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server
    Start(start::StartArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself; logging
    // falls back to defaults so that report is still visible.
    let logging = agora_config::load_config(None)
        .map(|loaded| loaded.config.logging)
        .unwrap_or_default();

    // Console layer plus a daily rolling JSON file
    let filter = if cli.verbose {
        "agora=debug,agora_server=debug,agora_auth=debug,agora_config=debug,tower_http=debug,info"
    } else {
        "agora=info,agora_server=info,agora_auth=info,warn"
    };

    let log_dir = logging.dir.clone().unwrap_or_else(|| {
        agora_config::user_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| std::path::PathBuf::from("logs"))
    });
    let file_appender = tracing_appender::rolling::daily(&log_dir, &logging.file_prefix);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "agora=trace,agora_server=trace,agora_auth=trace,agora_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
