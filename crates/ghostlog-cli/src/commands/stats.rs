//! `ghostlog stats`: record and cache counts

use ghostlog_core::error::GhostlogResult;

use super::{close_audit, CommandContext};

pub async fn execute(ctx: &CommandContext) -> GhostlogResult<()> {
    let audit = ctx.open_audit()?;
    let stats = audit.stats();
    close_audit(audit)?;
    let stats = stats?;

    ctx.output.heading(&format!("Stores in {}", ctx.config.storage.db_dir));
    ctx.output.field("deletions", stats.deletions);
    ctx.output.field("edits", stats.edits);
    ctx.output.field("cached files", stats.cached_files);
    Ok(())
}
