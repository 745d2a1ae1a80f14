//! Order reads and lifecycle transitions.

use std::io::Read;

use anyhow::{Context as _, Result};
use emporium_commerce::prelude::*;

use super::{parse_id, OrderArgs, OrderCommand};
use crate::context::Context;
use crate::output::{short_id, status_badge};

/// Run the order command.
pub async fn run(args: OrderArgs, ctx: &Context) -> Result<()> {
    let commerce = ctx.commerce().await?;
    let orders = &commerce.orders;
    let actor = ctx.operator();

    let order = match args.command {
        OrderCommand::List { all, status } => {
            let list = if all {
                let status = status.map(|s| s.parse::<OrderStatus>()).transpose()?;
                orders.all_orders(&actor, status).await?
            } else {
                orders.my_orders(&ctx.shopper()?).await?
            };
            print_orders(ctx, &list);
            return Ok(());
        }
        OrderCommand::Show { id } => orders.order(&actor, parse_id(&id, "order")?).await?,
        OrderCommand::Pay { id, method } => {
            orders
                .confirm_payment(&actor, parse_id(&id, "order")?, method)
                .await?
        }
        OrderCommand::Ship { id, tracking } => {
            orders
                .ship(&actor, parse_id(&id, "order")?, &tracking)
                .await?
        }
        OrderCommand::Complete { id } => {
            orders.complete(&actor, parse_id(&id, "order")?).await?
        }
        OrderCommand::Cancel { id, yes } => {
            let order_id: OrderId = parse_id(&id, "order")?;
            if !ctx
                .output
                .confirm(&format!("Cancel order {} and restock its items?", order_id), yes)?
            {
                ctx.output.info("Aborted");
                return Ok(());
            }
            orders.cancel(&actor, order_id).await?
        }
        OrderCommand::Webhook { file, payload } => {
            let payload = match (file, payload) {
                (_, Some(inline)) => inline,
                (Some(path), None) => read_payload(ctx, &path)?,
                (None, None) => anyhow::bail!("Pass --file or --payload"),
            };
            let webhook = PaymentWebhook::from_json(&payload)?;
            orders.apply_payment_webhook(&actor, webhook).await?
        }
    };

    if ctx.output.is_json() {
        ctx.output.json(&order);
    } else {
        print_order(ctx, &order);
    }
    Ok(())
}

fn read_payload(ctx: &Context, path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read webhook payload from stdin")?;
        return Ok(buf);
    }
    let path = ctx.resolve_path(path);
    std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read webhook payload: {}", path.display()))
}

pub(crate) fn print_order(ctx: &Context, order: &Order) {
    ctx.output.header(&format!("Order {}", order.id));
    ctx.output.kv("status", &status_badge(order.status));
    ctx.output.kv("user", &order.user_id.to_string());
    ctx.output
        .kv("placed", &order.created_at.format("%Y-%m-%d %H:%M").to_string());
    if let Some(method) = &order.payment_method {
        ctx.output.kv("payment", method);
    }
    if let Some(tracking) = &order.tracking_number {
        ctx.output.kv("tracking", tracking);
    }
    for item in &order.items {
        ctx.output.list_item(&format!(
            "{} x {} ({}) @ {}",
            item.quantity, item.name, item.sku, item.price
        ));
    }
    ctx.output.kv("subtotal", &order.subtotal.to_string());
    if let Some(code) = &order.coupon_code {
        ctx.output
            .kv("discount", &format!("-{} ({})", order.discount, code));
    }
    ctx.output.kv("total", &order.total.to_string());
}

fn print_orders(ctx: &Context, orders: &[Order]) {
    if ctx.output.is_json() {
        ctx.output.json(&orders);
        return;
    }

    ctx.output.header(&format!("Orders ({})", orders.len()));
    let widths = [8, 8, 10, 5, 10, 16];
    ctx.output.table_row(
        &["ID", "USER", "STATUS", "ITEMS", "TOTAL", "PLACED"],
        &widths,
    );
    for order in orders {
        ctx.output.table_row(
            &[
                &short_id(&order.id),
                &short_id(&order.user_id),
                order.status.as_str(),
                &order.item_count().to_string(),
                &order.total.to_string(),
                &order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ],
            &widths,
        );
    }
}
