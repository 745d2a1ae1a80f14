//! Checkout: turning a cart into an order.

use crate::auth::Actor;
use crate::cart::CartPricing;
use crate::catalog::StockLedger;
use crate::coupon::CouponValidator;
use crate::ids::AddressId;
use crate::money::Money;
use crate::order::{Order, OrderItem};
use crate::service::ServiceContext;
use crate::CommerceError;

/// The checkout orchestrator.
#[derive(Clone)]
pub struct CheckoutService {
    ctx: ServiceContext,
}

impl CheckoutService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Place an order from the actor's cart.
    ///
    /// Runs as a single unit of work:
    ///
    /// 1. load the cart; an empty (or missing) cart fails with `CartIsEmpty`
    ///    before anything is written
    /// 2. reserve stock for every line in cart order and snapshot its price
    /// 3. re-validate the attached coupon and price the snapshot
    /// 4. insert the pending order with its items
    /// 5. empty the cart and detach the coupon
    ///
    /// Any failure rolls back every reservation made so far.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn checkout(
        &self,
        actor: &Actor,
        shipping_address_id: AddressId,
    ) -> Result<Order, CommerceError> {
        let user_id = actor.user_id;
        let now = self.ctx.clock.now();
        let currency = self.ctx.config.currency;
        let count_usage = self.ctx.config.checkout.count_coupon_usage;

        let order = self
            .ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let cart = match repos.carts().find_by_user_for_update(user_id).await? {
                        Some(cart) if !cart.is_empty() => cart,
                        _ => return Err(CommerceError::CartIsEmpty),
                    };

                    let mut items = Vec::with_capacity(cart.items.len());
                    for line in &cart.items {
                        let reservation =
                            StockLedger::reserve(repos.products(), line.product_id, line.quantity, now)
                                .await?;
                        items.push(OrderItem::snapshot(&reservation.product, line.quantity));
                    }

                    let coupon = match cart.coupon_id {
                        Some(coupon_id) => {
                            Some(CouponValidator::validate_id(repos.coupons(), coupon_id, now).await?)
                        }
                        None => None,
                    };

                    let line_totals = items
                        .iter()
                        .map(OrderItem::line_total)
                        .collect::<Result<Vec<Money>, _>>()?;
                    let pricing = CartPricing::compute(
                        &line_totals,
                        coupon.as_ref().map(|c| &c.discount),
                        currency,
                    )?;

                    if let (Some(coupon), true) = (&coupon, count_usage) {
                        if !repos.coupons().increment_usage(coupon.id, now).await? {
                            return Err(CommerceError::CouponUsageLimitReached(coupon.code.clone()));
                        }
                    }

                    let order = Order::place(
                        user_id,
                        shipping_address_id,
                        items,
                        &pricing,
                        coupon.map(|c| c.code),
                        now,
                    );
                    repos.orders().insert(&order).await?;

                    repos.carts().clear(cart.id).await?;
                    repos.carts().set_coupon(cart.id, None, now).await?;
                    Ok(order)
                })
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = order.items.len(),
            "order placed"
        );
        Ok(order)
    }
}
