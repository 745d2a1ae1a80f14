//! Cart commands, acting on the `--user` cart.

use anyhow::Result;
use emporium_commerce::prelude::*;

use super::{parse_id, CartArgs, CartCommand};
use crate::context::Context;
use crate::output::short_id;

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let actor = ctx.shopper()?;
    let commerce = ctx.commerce().await?;
    let carts = &commerce.carts;

    let view = match args.command {
        CartCommand::Show => carts.cart(&actor).await?,
        CartCommand::Add { product, quantity } => {
            carts
                .add_item(&actor, parse_id(&product, "product")?, quantity)
                .await?
        }
        CartCommand::Set { item, quantity } => {
            carts
                .update_item(&actor, parse_id(&item, "cart item")?, quantity)
                .await?
        }
        CartCommand::Remove { item } => {
            carts
                .remove_item(&actor, parse_id(&item, "cart item")?)
                .await?
        }
        CartCommand::ApplyCoupon { code } => carts.apply_coupon(&actor, &code).await?,
        CartCommand::RemoveCoupon => carts.remove_coupon(&actor).await?,
    };

    print_cart(ctx, &view);
    Ok(())
}

pub(crate) fn print_cart(ctx: &Context, view: &CartView) {
    if ctx.output.is_json() {
        ctx.output.json(view);
        return;
    }

    ctx.output.header(&format!("Cart {}", view.cart.id));
    if view.lines.is_empty() {
        ctx.output.info("Cart is empty");
    } else {
        let widths = [8, 14, 28, 10, 4, 10];
        ctx.output
            .table_row(&["ITEM", "SKU", "NAME", "PRICE", "QTY", "TOTAL"], &widths);
        for line in &view.lines {
            ctx.output.table_row(
                &[
                    &short_id(&line.item_id),
                    &line.sku,
                    &line.name,
                    &line.unit_price.to_string(),
                    &line.quantity.to_string(),
                    &line.line_total.to_string(),
                ],
                &widths,
            );
            if line.quantity > line.available {
                ctx.output.warn(&format!(
                    "{}: only {} in stock",
                    line.sku, line.available
                ));
            }
        }
    }

    if let Some(coupon) = &view.coupon {
        ctx.output.kv("coupon", &coupon.code);
    }
    if let Some(issue) = &view.coupon_issue {
        ctx.output.warn(issue);
    }
    ctx.output.kv("subtotal", &view.pricing.subtotal.to_string());
    if view.pricing.has_discount() {
        ctx.output.kv("discount", &format!("-{}", view.pricing.discount));
    }
    ctx.output.kv("total", &view.pricing.grand_total.to_string());
}
