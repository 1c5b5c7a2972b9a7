//! opsclaw CLI — the main entry point.
//!
//! Commands:
//! - `prompt`  — Run the agent with a literal instruction
//! - `oncall`  — Work through a runbook as the oncall engineer
//! - `analyze` — Check a graph image for anomalies
//! - `upload`  — Push a file to the knowledge base
//! - `doctor`  — Report which keys and endpoints are configured

use clap::{Parser, Subcommand};
use opsclaw_config::AppConfig;
use std::path::{Path, PathBuf};

mod commands;

#[derive(Parser)]
#[command(
    name = "opsclaw",
    about = "opsclaw — an oncall AI agent for the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.opsclaw/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run shell commands without asking for approval
    #[arg(short = 'y', long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent with the given prompt
    Prompt {
        /// The prompt text to process
        text: String,
    },

    /// Start the oncall response process
    Oncall {
        /// Path to the runbook file
        #[arg(short, long)]
        runbook: PathBuf,

        /// Specific oncall request
        #[arg(short = 'q', long)]
        request: Option<String>,
    },

    /// Analyze a graph image for anomalies
    Analyze {
        /// Path to the image
        image: PathBuf,
    },

    /// Upload a file to the knowledge base
    Upload {
        /// Path to the file
        file: PathBuf,

        /// Document name (default: the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Report which API keys and endpoints are configured
    Doctor,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the agent's console blocks
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Prompt { text } => {
            commands::prompt::run(&load_config(config_path)?, cli.yes, &text).await?
        }
        Commands::Oncall { runbook, request } => {
            commands::oncall::run(&load_config(config_path)?, cli.yes, &runbook, request).await?
        }
        Commands::Analyze { image } => {
            commands::analyze::run(&load_config(config_path)?, &image).await?
        }
        Commands::Upload { file, name } => {
            commands::upload::run(&load_config(config_path)?, &file, name).await?
        }
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
