//! Coupon administration.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Duration, Utc};
use emporium_commerce::prelude::*;

use super::{parse_id, CouponArgs, CouponCommand};
use crate::context::Context;
use crate::output::short_id;

/// Run the coupon command.
pub async fn run(args: CouponArgs, ctx: &Context) -> Result<()> {
    let commerce = ctx.commerce().await?;
    let actor = ctx.operator();

    match args.command {
        CouponCommand::Add {
            code,
            fixed,
            percent,
            days,
            expires,
            limit,
        } => {
            let discount = match (fixed, percent) {
                (Some(amount), _) => {
                    DiscountValue::Fixed(Money::parse(&amount, ctx.config.commerce.currency)?)
                }
                (None, Some(percent)) => DiscountValue::Percentage(percent),
                (None, None) => anyhow::bail!("Pass --fixed or --percent"),
            };
            let expires_at = match expires {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("Invalid --expires timestamp: '{}'", raw))?
                    .with_timezone(&Utc),
                None => Utc::now() + Duration::days(days),
            };
            let input = NewCoupon {
                code,
                discount,
                expires_at,
                usage_limit: limit,
                is_active: true,
            };
            let coupon = commerce.coupons.create_coupon(&actor, input).await?;
            print_coupon(ctx, &coupon, "Created coupon");
        }
        CouponCommand::List => {
            let coupons = commerce.coupons.coupons(&actor).await?;
            print_coupons(ctx, &coupons);
        }
        CouponCommand::Disable { id } => {
            let coupon = commerce
                .coupons
                .update_coupon(&actor, parse_id(&id, "coupon")?, CouponPatch::active(false))
                .await?;
            print_coupon(ctx, &coupon, "Disabled coupon");
        }
        CouponCommand::Delete { id, yes } => {
            let coupon_id: CouponId = parse_id(&id, "coupon")?;
            let coupon = commerce.coupons.coupon(&actor, coupon_id).await?;
            if !ctx
                .output
                .confirm(&format!("Delete coupon {}?", coupon.code), yes)?
            {
                ctx.output.info("Aborted");
                return Ok(());
            }
            commerce.coupons.delete_coupon(&actor, coupon_id).await?;
            ctx.output.success(&format!("Deleted {}", coupon.code));
        }
    }

    Ok(())
}

fn describe(discount: &DiscountValue) -> String {
    match discount {
        DiscountValue::Fixed(amount) => format!("{} off", amount),
        DiscountValue::Percentage(percent) => format!("{}% off", percent),
    }
}

fn print_coupon(ctx: &Context, coupon: &Coupon, verb: &str) {
    if ctx.output.is_json() {
        ctx.output.json(coupon);
        return;
    }
    ctx.output.success(&format!("{} {}", verb, coupon.code));
    ctx.output.kv("id", &coupon.id.to_string());
    ctx.output.kv("discount", &describe(&coupon.discount));
    ctx.output.kv("expires_at", &coupon.expires_at.to_rfc3339());
    ctx.output.kv(
        "usage",
        &format!("{}/{}", coupon.usage_count, coupon.usage_limit),
    );
    ctx.output.kv("active", &coupon.is_active.to_string());
}

fn print_coupons(ctx: &Context, coupons: &[Coupon]) {
    if ctx.output.is_json() {
        ctx.output.json(&coupons);
        return;
    }

    ctx.output.header(&format!("Coupons ({})", coupons.len()));
    let widths = [8, 12, 14, 10, 20, 6];
    ctx.output.table_row(
        &["ID", "CODE", "DISCOUNT", "USAGE", "EXPIRES", "ACTIVE"],
        &widths,
    );
    for coupon in coupons {
        ctx.output.table_row(
            &[
                &short_id(&coupon.id),
                &coupon.code,
                &describe(&coupon.discount),
                &format!("{}/{}", coupon.usage_count, coupon.usage_limit),
                &coupon.expires_at.format("%Y-%m-%d %H:%M").to_string(),
                if coupon.is_active { "yes" } else { "no" },
            ],
            &widths,
        );
    }
}
