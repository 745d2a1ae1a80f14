//! Write a starter configuration file.

use anyhow::{bail, Result};
use emporium_db::DbConfig;

use super::InitArgs;
use crate::config::{generate_default_config, AppConfig};
use crate::context::Context;

/// Run the init command.
pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.path);
    ctx.output.header(&format!("Initializing {}", path.display()));

    if path.exists() && !args.force {
        bail!(
            "'{}' already exists; pass --force to overwrite",
            path.display()
        );
    }

    let url = args
        .database_url
        .unwrap_or_else(|| ctx.config.database.url.clone());
    DbConfig::new(url.clone()).validate()?;

    if path.extension().map_or(false, |ext| ext == "json") {
        let mut config = AppConfig::default();
        config.database.url = url;
        config.save(&path)?;
    } else {
        std::fs::write(&path, generate_default_config(&url))?;
    }

    ctx.output.success(&format!("Wrote {}", path.display()));
    ctx.output.info("");
    ctx.output.info("Next steps:");
    ctx.output.list_item("emporium config validate");
    ctx.output.list_item("emporium migrate");
    ctx.output.list_item("emporium product add --sku LAMP-01 --name \"Desk Lamp\" --price 25.00");

    Ok(())
}
