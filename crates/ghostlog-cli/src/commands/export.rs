//! `ghostlog export`: write the audit logs and cache index to CSV

use ghostlog_core::error::GhostlogResult;

use super::{close_audit, CommandContext};

pub async fn execute(ctx: &CommandContext) -> GhostlogResult<()> {
    let audit = ctx.open_audit()?;
    let summary = audit.export();
    close_audit(audit)?;
    let summary = summary?;

    for file in summary.files() {
        ctx.output.field(&format!("{} rows", file.rows), &file.path);
    }
    ctx.output.success(&summary.acknowledgment());
    Ok(())
}
