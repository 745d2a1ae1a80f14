//! Configuration commands.

use anyhow::Result;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    if ctx.output.is_json() {
        let mut redacted = config.clone();
        redacted.database.url = config.database.redacted_url();
        ctx.output.json(&redacted);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(none, using defaults)"),
    }

    ctx.output.info("[database]");
    ctx.output.kv("url", &config.database.redacted_url());
    ctx.output
        .kv("max_connections", &config.database.max_connections.to_string());
    ctx.output.kv(
        "acquire_timeout_secs",
        &config.database.acquire_timeout_secs.to_string(),
    );

    ctx.output.info("[commerce]");
    ctx.output.kv("currency", config.commerce.currency.code());
    ctx.output.kv(
        "max_quantity_per_item",
        &config.commerce.max_quantity_per_item.to_string(),
    );
    ctx.output.kv(
        "checkout.count_coupon_usage",
        &config.commerce.checkout.count_coupon_usage.to_string(),
    );

    ctx.output.info("[logging]");
    ctx.output.kv("level", config.logging.level.as_str());
    ctx.output.kv("format", &format!("{:?}", config.logging.format).to_lowercase());
    if let Some(directives) = &config.logging.directives {
        ctx.output.kv("directives", directives);
    }

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.config.validate()?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "valid": true }));
    } else {
        ctx.output.success("Configuration is valid");
    }
    Ok(())
}
