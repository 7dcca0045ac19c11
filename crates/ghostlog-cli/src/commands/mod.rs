//! Command implementations and dispatch logic.
//!
//! This module contains all command handlers and the central dispatch system.
//! Each command is implemented as an async function that takes a CommandContext.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ghostlog_audit::AuditContext;
use ghostlog_config::{ConfigLayering, ConfigLoader, ConfigSource, GhostlogToml};
use ghostlog_core::error::GhostlogResult;
use tracing::{debug, info, warn};

pub mod check;
pub mod export;
pub mod ingest;
pub mod stats;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Cli, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    /// Effective configuration with storage paths resolved
    pub config: GhostlogToml,
    pub source: ConfigSource,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Load configuration for the process working directory and CLI flags
    pub async fn from_cli(cli: &Cli) -> GhostlogResult<Self> {
        let loader = ConfigLoader::from_current_dir()?;
        let layering = cli_layering(cli, ConfigLayering::new().with_process_env());
        Self::load(loader, cli.config.as_deref(), &layering).await
    }

    /// Load configuration through `loader` and apply `layering`
    pub async fn load(
        loader: ConfigLoader,
        explicit: Option<&camino::Utf8Path>,
        layering: &ConfigLayering,
    ) -> GhostlogResult<Self> {
        let (file_config, source) = loader.load(explicit).await?;
        let mut config = layering.apply(file_config)?;
        config.storage = config.storage.resolved(&loader.base_dir(&source));

        Ok(Self {
            cwd: loader.cwd().to_path_buf(),
            config,
            source,
            output: OutputHandler::new(),
        })
    }

    /// Open every store with an HTTP fetcher
    pub fn open_audit(&self) -> GhostlogResult<Arc<AuditContext>> {
        Ok(Arc::new(AuditContext::open(&self.config)?))
    }
}

/// Close a shared audit context once every other handle is gone
pub fn close_audit(context: Arc<AuditContext>) -> GhostlogResult<()> {
    match Arc::try_unwrap(context) {
        Ok(context) => context.close(),
        Err(_) => {
            warn!("Audit stores still in use; skipping explicit close");
            Ok(())
        },
    }
}

/// Translate global and per-command flags into config overrides
pub fn cli_layering(cli: &Cli, mut layering: ConfigLayering) -> ConfigLayering {
    if let Some(dir) = &cli.db_dir {
        layering = layering.with_cli("storage.db_dir", dir);
    }
    if let Some(dir) = &cli.cache_dir {
        layering = layering.with_cli("storage.cache_dir", dir);
    }
    if let Some(dir) = &cli.csv_dir {
        layering = layering.with_cli("storage.csv_dir", dir);
    }

    if let Some(Commands::Ingest {
        max_in_flight,
        max_concurrent,
        timeout_secs,
        ..
    }) = &cli.command
    {
        if let Some(value) = max_in_flight {
            layering = layering.with_cli("ingest.max_in_flight", value);
        }
        if let Some(value) = max_concurrent {
            layering = layering.with_cli("fetch.max_concurrent", value);
        }
        if let Some(value) = timeout_secs {
            layering = layering.with_cli("fetch.timeout_secs", value);
        }
    }

    debug!("Built CLI configuration overrides");
    layering
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> GhostlogResult<()> {
    match command {
        Commands::Ingest { file, .. } => {
            info!("Ingesting events from {}", file.as_ref().map_or("stdin".into(), |f| f.display().to_string()));
            ingest::execute(file, ctx).await
        },
        Commands::Export => {
            info!("Exporting audit trail to {}", ctx.config.storage.csv_dir);
            export::execute(ctx).await
        },
        Commands::Stats => {
            info!("Collecting statistics");
            stats::execute(ctx).await
        },
        Commands::Check => {
            info!("Checking configuration");
            check::execute(ctx).await
        },
        Commands::Version => {
            info!("Showing version information");
            show_version(ctx).await
        },
    }
}

/// Show help information
pub async fn show_help(ctx: &CommandContext) -> GhostlogResult<()> {
    ctx.output.info("ghostlog - message deletion and edit audit trail");
    ctx.output.info("");
    ctx.output.info("Usage: ghostlog [OPTIONS] [COMMAND]");
    ctx.output.info("");
    ctx.output.info("Commands:");
    ctx.output.info("  ingest [FILE]  Replay a JSON-lines event feed");
    ctx.output.info("  export         Export the audit logs to CSV");
    ctx.output.info("  stats          Show record and cache counts");
    ctx.output.info("  check          Validate the configuration");
    ctx.output.info("  version        Show version information");
    ctx.output.info("");
    ctx.output.info("Run 'ghostlog <command> --help' for more information on a command.");
    Ok(())
}

async fn show_version(ctx: &CommandContext) -> GhostlogResult<()> {
    ctx.output
        .heading(&format!("ghostlog v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.field("built", env!("GHOSTLOG_BUILD_DATE"));
    ctx.output.field("target", env!("GHOSTLOG_TARGET"));
    ctx.output.field("rustc", env!("GHOSTLOG_RUSTC_VERSION"));
    ctx.output.field("sqlite", ghostlog_audit::sqlite_version());

    Ok(())
}
