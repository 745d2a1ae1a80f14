//! Category administration.

use anyhow::Result;
use emporium_commerce::prelude::*;

use super::{parse_id, CategoryArgs, CategoryCommand};
use crate::context::Context;
use crate::output::short_id;

/// Run the category command.
pub async fn run(args: CategoryArgs, ctx: &Context) -> Result<()> {
    let commerce = ctx.commerce().await?;
    let actor = ctx.operator();

    match args.command {
        CategoryCommand::Add { name, description } => {
            let category = commerce
                .catalog
                .create_category(&actor, NewCategory { name, description })
                .await?;
            print_category(ctx, &category, "Created category");
        }
        CategoryCommand::List => {
            let categories = commerce.catalog.categories().await?;
            print_categories(ctx, &categories);
        }
        CategoryCommand::Update {
            id,
            name,
            description,
        } => {
            let category = commerce
                .catalog
                .update_category(
                    &actor,
                    parse_id(&id, "category")?,
                    CategoryPatch { name, description },
                )
                .await?;
            print_category(ctx, &category, "Updated category");
        }
        CategoryCommand::Delete { id, yes } => {
            let category_id: CategoryId = parse_id(&id, "category")?;
            let category = commerce.catalog.category(category_id).await?;
            if !ctx
                .output
                .confirm(&format!("Delete category {}?", category.name), yes)?
            {
                ctx.output.info("Aborted");
                return Ok(());
            }
            commerce.catalog.delete_category(&actor, category_id).await?;
            ctx.output.success(&format!("Deleted {}", category.name));
        }
    }

    Ok(())
}

fn print_category(ctx: &Context, category: &Category, verb: &str) {
    if ctx.output.is_json() {
        ctx.output.json(category);
        return;
    }
    ctx.output.success(&format!("{} {}", verb, category.name));
    ctx.output.kv("id", &category.id.to_string());
    if let Some(description) = &category.description {
        ctx.output.kv("description", description);
    }
}

fn print_categories(ctx: &Context, categories: &[Category]) {
    if ctx.output.is_json() {
        ctx.output.json(&categories);
        return;
    }

    ctx.output.header(&format!("Categories ({})", categories.len()));
    let widths = [8, 24, 40];
    ctx.output
        .table_row(&["ID", "NAME", "DESCRIPTION"], &widths);
    for category in categories {
        ctx.output.table_row(
            &[
                &short_id(&category.id),
                &category.name,
                category.description.as_deref().unwrap_or("-"),
            ],
            &widths,
        );
    }
}
