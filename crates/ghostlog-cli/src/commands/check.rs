//! `ghostlog check`: validate and print the effective configuration

use ghostlog_config::toml::serialize_ghostlog_toml;
use ghostlog_core::error::GhostlogResult;

use super::CommandContext;

pub async fn execute(ctx: &CommandContext) -> GhostlogResult<()> {
    // Loading already validated every layer
    let rendered = serialize_ghostlog_toml(&ctx.config)?;

    ctx.output.success(&format!("Configuration is valid ({})", ctx.source));
    println!("{}", rendered);
    Ok(())
}
