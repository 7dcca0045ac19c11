//! # ghostlog
//!
//! Audit trail for deleted and edited chat messages.
//!
//! This is the main entry point for the ghostlog CLI. It parses commands,
//! loads the layered configuration, sets up logging and dispatches to the
//! command handlers.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use ghostlog_core::error::{GhostlogError, GhostlogResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Audit trail for deleted and edited messages
#[derive(Parser, Debug)]
#[command(name = "ghostlog", version, about = "Message deletion and edit audit trail")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: nearest ghostlog.toml)
    #[arg(short, long, global = true, env = "GHOSTLOG_CONFIG", value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding the SQLite databases
    #[arg(long, global = true, value_name = "DIR")]
    pub db_dir: Option<Utf8PathBuf>,

    /// Directory holding cached attachments
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Directory receiving CSV exports
    #[arg(long, global = true, value_name = "DIR")]
    pub csv_dir: Option<Utf8PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON-lines event feed
    Ingest {
        /// Feed file; standard input when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Events handled concurrently
        #[arg(long)]
        max_in_flight: Option<usize>,
        /// Concurrent attachment downloads
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Per-download timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Export the audit logs and cache index to CSV
    Export,
    /// Show record and cache counts
    Stats,
    /// Validate and print the effective configuration
    Check,
    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    setup_panic_handler();

    if let Err(e) = run_cli(cli) {
        eprint!("{}", ErrorFormatter::new().format_error(&e));
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> GhostlogResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| GhostlogError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::from_cli(&cli).await?;
        setup_logging(cli.verbose, &ctx.config.logging.level);
        info!("Starting ghostlog v{}", env!("CARGO_PKG_VERSION"));

        match cli.command {
            Some(command) => commands::dispatch_command(command, &ctx).await,
            None => commands::show_help(&ctx).await,
        }
    })
}

fn setup_logging(verbose: bool, configured_level: &str) {
    let level = if verbose { "debug" } else { configured_level };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            [
                "ghostlog",
                "ghostlog_core",
                "ghostlog_config",
                "ghostlog_fetch",
                "ghostlog_cache",
                "ghostlog_audit",
            ]
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(","),
        )
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("ghostlog encountered an unexpected error: {}", panic_info);
        eprintln!("ghostlog crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
