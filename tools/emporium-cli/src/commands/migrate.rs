//! Create the database schema.

use anyhow::{Context as _, Result};
use emporium_db::schema;

use super::MigrateArgs;
use crate::context::Context;

/// Run the migrate command.
pub async fn run(args: MigrateArgs, ctx: &Context) -> Result<()> {
    if args.dry_run {
        for statement in schema::STATEMENTS {
            println!("{};\n", statement.trim());
        }
        return Ok(());
    }

    ctx.output.header("Migrating database");
    ctx.output
        .debug(&format!("Target: {}", ctx.config.database.redacted_url()));

    let db = ctx.connect().await?;
    let spinner = ctx.output.spinner("Creating tables...");
    let result = db.migrate().await;
    spinner.finish_and_clear();
    result.context("Migration failed")?;
    db.close().await;

    if ctx.output.is_json() {
        ctx.output
            .json(&serde_json::json!({ "migrated": true, "statements": schema::STATEMENTS.len() }));
    } else {
        ctx.output.success(&format!(
            "Schema up to date ({} statements)",
            schema::STATEMENTS.len()
        ));
    }
    Ok(())
}
