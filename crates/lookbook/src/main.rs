//! Lookbook - outfit photo in, ranked fashion recommendations out
//!
//! Main entry point for the Lookbook CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::Style;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;
mod view;

use commands::{handshake, recommend};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Lookbook - outfit photo in, ranked fashion recommendations out
#[derive(Parser)]
#[command(name = "lookbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// MCP endpoint URL (default: http://localhost:8000/mcp)
    #[arg(long, global = true, env = "LOOKBOOK_ENDPOINT")]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get recommendations for an outfit photo
    Recommend(recommend::RecommendArgs),

    /// Open a session and print its token
    Handshake(handshake::HandshakeArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let red = Style::new().red().for_stderr();
            eprintln!("{} {:#}", red.apply_to("Error:"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let loaded = lookbook_config::load_config(None)?;
    tracing::debug!(sources = ?loaded.loaded_from(), "configuration loaded");

    let mut config = loaded.config;
    if let Some(endpoint) = cli.endpoint {
        config = config.with_endpoint(endpoint);
    }

    let ctx = commands::Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Recommend(args) => recommend::run(args, &ctx).await,
        Commands::Handshake(args) => handshake::run(args, &ctx).await,
    }
}

/// Console (human-readable, stderr) plus rotating JSON file.
///
/// The file layer is skipped when the log directory cannot be created.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "lookbook=debug,lookbook_mcp=debug,lookbook_config=debug,info"
    } else {
        "lookbook=info,lookbook_mcp=warn,lookbook_config=warn,warn"
    };

    let log_dir = lookbook_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("lookbook.log")
        .build(&log_dir)
        .ok();
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "lookbook=trace,lookbook_mcp=trace,lookbook_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}
