//! `ghostlog ingest`: replay a JSON-lines event feed

use std::path::PathBuf;

use ghostlog_audit::{EventHandler, IngestReport, Ingestor};
use ghostlog_core::error::{GhostlogError, GhostlogResult};
use tokio::io::BufReader;
use tracing::debug;

use super::{close_audit, CommandContext};
use crate::output::colors::Style;

pub async fn execute(file: Option<PathBuf>, ctx: &CommandContext) -> GhostlogResult<()> {
    let audit = ctx.open_audit()?;
    let ingestor = Ingestor::new(EventHandler::new(audit.clone()), ctx.config.ingest.max_in_flight);
    debug!("Ingesting with {} events in flight", ctx.config.ingest.max_in_flight);

    let report = match &file {
        Some(path) => {
            let feed = tokio::fs::File::open(path).await.map_err(|e| {
                GhostlogError::io(format!("Failed to open {}", path.display()), e)
            })?;
            ingestor.run(BufReader::new(feed)).await?
        },
        None => ingestor.run(BufReader::new(tokio::io::stdin())).await?,
    };

    drop(ingestor);
    close_audit(audit)?;

    print_report(ctx, &report);
    Ok(())
}

fn print_report(ctx: &CommandContext, report: &IngestReport) {
    for reply in &report.replies {
        ctx.output.info(reply);
    }

    ctx.output.success(&format!("Handled {} events", report.handled()));
    ctx.output.field("deleted", report.deleted);
    ctx.output.field("edited", report.edited);
    ctx.output.field("exported", report.exported);
    ctx.output.field("ignored", report.ignored);
    ctx.output.count("failed", report.failed, Style::Failure);
    ctx.output.count("malformed", report.malformed, Style::Warning);

    if report.failed > 0 {
        ctx.output
            .warn("Failed events were not recorded; see the log for details");
    }
}
