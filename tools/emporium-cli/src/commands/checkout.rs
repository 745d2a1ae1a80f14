//! Place an order from the `--user` cart.

use anyhow::Result;
use emporium_commerce::prelude::*;

use super::{parse_id, CheckoutArgs};
use crate::context::Context;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let actor = ctx.shopper()?;
    let address: AddressId = parse_id(&args.address, "address")?;
    let commerce = ctx.commerce().await?;

    let spinner = ctx.output.spinner("Placing order...");
    let result = commerce.checkout.checkout(&actor, address).await;
    spinner.finish_and_clear();
    let order = result?;

    if ctx.output.is_json() {
        ctx.output.json(&order);
    } else {
        ctx.output.success(&format!("Order {} placed", order.id));
        super::order::print_order(ctx, &order);
    }
    Ok(())
}
