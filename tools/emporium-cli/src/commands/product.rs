//! Catalog administration.

use anyhow::Result;
use emporium_commerce::prelude::*;

use super::{parse_id, ProductArgs, ProductCommand};
use crate::context::Context;
use crate::output::short_id;

/// Run the product command.
pub async fn run(args: ProductArgs, ctx: &Context) -> Result<()> {
    let commerce = ctx.commerce().await?;
    let actor = ctx.operator();
    let currency = ctx.config.commerce.currency;
    let money = |raw: Option<String>| raw.map(|r| Money::parse(&r, currency)).transpose();
    let category = |raw: Option<String>| -> Result<Option<CategoryId>> {
        raw.map(|r| parse_id(&r, "category")).transpose()
    };

    match args.command {
        ProductCommand::Add {
            sku,
            name,
            price,
            quantity,
            description,
            category: category_id,
        } => {
            let input = NewProduct {
                sku,
                name,
                description,
                category_id: category(category_id)?,
                price: Money::parse(&price, currency)?,
                quantity,
            };
            let product = commerce.catalog.create_product(&actor, input).await?;
            print_product(ctx, &product, "Created product");
        }
        ProductCommand::List {
            search,
            category: category_id,
            min_price,
            max_price,
            in_stock,
            limit,
            offset,
        } => {
            let filter = ProductFilter {
                search,
                category_id: category(category_id)?,
                min_price: money(min_price)?,
                max_price: money(max_price)?,
                in_stock_only: in_stock,
                limit,
                offset,
            };
            let products = commerce.catalog.products(&filter).await?;
            print_products(ctx, &products);
        }
        ProductCommand::Update {
            id,
            sku,
            name,
            description,
            category: category_id,
            price,
        } => {
            let patch = ProductPatch {
                sku,
                name,
                description,
                category_id: category(category_id)?,
                price: money(price)?,
            };
            let product = commerce
                .catalog
                .update_product(&actor, parse_id(&id, "product")?, patch)
                .await?;
            print_product(ctx, &product, "Updated product");
        }
        ProductCommand::Restock { id, quantity } => {
            let product_id: ProductId = parse_id(&id, "product")?;
            let remaining = commerce.catalog.restock(&actor, product_id, quantity).await?;
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({
                    "product_id": product_id,
                    "quantity": remaining,
                }));
            } else {
                ctx.output
                    .success(&format!("Restocked {}: {} in stock", product_id, remaining));
            }
        }
        ProductCommand::Delete { id, yes } => {
            let product_id: ProductId = parse_id(&id, "product")?;
            let product = commerce.catalog.product(product_id).await?;
            let prompt = format!("Delete {} ({})?", product.name, product.sku);
            if !ctx.output.confirm(&prompt, yes)? {
                ctx.output.info("Aborted");
                return Ok(());
            }
            commerce.catalog.delete_product(&actor, product_id).await?;
            ctx.output.success(&format!("Deleted {}", product.sku));
        }
    }

    Ok(())
}

fn print_product(ctx: &Context, product: &Product, verb: &str) {
    if ctx.output.is_json() {
        ctx.output.json(product);
        return;
    }
    ctx.output
        .success(&format!("{} {} ({})", verb, product.name, product.sku));
    ctx.output.kv("id", &product.id.to_string());
    if let Some(category_id) = product.category_id {
        ctx.output.kv("category", &category_id.to_string());
    }
    ctx.output.kv("price", &product.price.to_string());
    ctx.output.kv("quantity", &product.quantity.to_string());
}

fn print_products(ctx: &Context, products: &[Product]) {
    if ctx.output.is_json() {
        ctx.output.json(&products);
        return;
    }

    ctx.output.header(&format!("Products ({})", products.len()));
    let widths = [8, 14, 28, 10, 6];
    ctx.output
        .table_row(&["ID", "SKU", "NAME", "PRICE", "STOCK"], &widths);
    for product in products {
        ctx.output.table_row(
            &[
                &short_id(&product.id),
                &product.sku,
                &product.name,
                &product.price.to_string(),
                &product.quantity.to_string(),
            ],
            &widths,
        );
    }
}
