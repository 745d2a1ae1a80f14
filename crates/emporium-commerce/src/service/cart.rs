//! Shopper-facing cart operations.

use chrono::{DateTime, Utc};

use crate::auth::Actor;
use crate::cart::{merged_quantity, CartLine, CartPricing, CartView};
use crate::coupon::CouponValidator;
use crate::ids::{CartItemId, ProductId, UserId};
use crate::money::{Currency, Money};
use crate::service::ServiceContext;
use crate::store::Repositories;
use crate::CommerceError;

/// Cart reads and edits for the acting user's own cart.
#[derive(Clone)]
pub struct CartService {
    ctx: ServiceContext,
}

impl CartService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// The actor's cart, created on first access.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn cart(&self, actor: &Actor) -> Result<CartView, CommerceError> {
        let (user_id, now, currency) = self.scope_args(actor);
        self.ctx
            .uow
            .execute(move |repos| Box::pin(load_view(repos, user_id, now, currency)))
            .await
    }

    /// Add units of a product, merging with an existing line.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn add_item(
        &self,
        actor: &Actor,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let (user_id, now, currency) = self.scope_args(actor);
        let cap = self.ctx.config.max_quantity_per_item;

        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let product = repos
                        .products()
                        .find_by_id(product_id)
                        .await?
                        .ok_or(CommerceError::ProductNotFound(product_id))?;
                    if quantity > product.quantity {
                        return Err(CommerceError::OutOfStock {
                            product: product.name,
                            available: product.quantity,
                            requested: quantity,
                        });
                    }

                    let cart = repos.carts().get_or_create(user_id, now).await?;
                    let existing = cart
                        .item_for_product(product_id)
                        .map(|i| i.quantity)
                        .unwrap_or(0);
                    merged_quantity(existing, quantity, cap)?;

                    repos
                        .carts()
                        .add_item(cart.id, product_id, quantity, now)
                        .await?;
                    load_view(repos, user_id, now, currency).await
                })
            })
            .await
    }

    /// Set a line's quantity. Zero removes the line.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn update_item(
        &self,
        actor: &Actor,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView, CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let (user_id, now, currency) = self.scope_args(actor);
        let cap = self.ctx.config.max_quantity_per_item;

        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let cart = repos.carts().get_or_create(user_id, now).await?;
                    let item = cart
                        .item(item_id)
                        .ok_or(CommerceError::CartItemNotFound(item_id))?;

                    if quantity == 0 {
                        repos.carts().remove_item(item_id).await?;
                    } else {
                        merged_quantity(0, quantity, cap)?;
                        let product = repos
                            .products()
                            .find_by_id(item.product_id)
                            .await?
                            .ok_or(CommerceError::ProductNotFound(item.product_id))?;
                        if quantity > product.quantity {
                            return Err(CommerceError::OutOfStock {
                                product: product.name,
                                available: product.quantity,
                                requested: quantity,
                            });
                        }
                        repos.carts().update_item_quantity(item_id, quantity).await?;
                    }
                    load_view(repos, user_id, now, currency).await
                })
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn remove_item(
        &self,
        actor: &Actor,
        item_id: CartItemId,
    ) -> Result<CartView, CommerceError> {
        let (user_id, now, currency) = self.scope_args(actor);
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let cart = repos.carts().get_or_create(user_id, now).await?;
                    if cart.item(item_id).is_none() {
                        return Err(CommerceError::CartItemNotFound(item_id));
                    }
                    repos.carts().remove_item(item_id).await?;
                    load_view(repos, user_id, now, currency).await
                })
            })
            .await
    }

    /// Attach a coupon, replacing any coupon already attached.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn apply_coupon(&self, actor: &Actor, code: &str) -> Result<CartView, CommerceError> {
        let (user_id, now, currency) = self.scope_args(actor);
        let code = code.to_string();
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let coupon = CouponValidator::validate_code(repos.coupons(), &code, now).await?;
                    let cart = repos.carts().get_or_create(user_id, now).await?;
                    repos.carts().set_coupon(cart.id, Some(coupon.id), now).await?;
                    load_view(repos, user_id, now, currency).await
                })
            })
            .await
    }

    /// Detach the coupon. Its usage count is untouched.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn remove_coupon(&self, actor: &Actor) -> Result<CartView, CommerceError> {
        let (user_id, now, currency) = self.scope_args(actor);
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let cart = repos.carts().get_or_create(user_id, now).await?;
                    repos.carts().set_coupon(cart.id, None, now).await?;
                    load_view(repos, user_id, now, currency).await
                })
            })
            .await
    }

    fn scope_args(&self, actor: &Actor) -> (UserId, DateTime<Utc>, Currency) {
        (actor.user_id, self.ctx.clock.now(), self.ctx.config.currency)
    }
}

/// Build the cart view inside an open scope.
///
/// Lines whose product has been deleted are dropped from the cart, and a
/// coupon that no longer exists is detached. A coupon that exists but no
/// longer validates stays attached and contributes no discount.
async fn load_view(
    repos: &mut dyn Repositories,
    user_id: UserId,
    now: DateTime<Utc>,
    currency: Currency,
) -> Result<CartView, CommerceError> {
    let mut cart = repos.carts().get_or_create(user_id, now).await?;

    let mut lines = Vec::with_capacity(cart.items.len());
    let mut stale = Vec::new();
    for item in &cart.items {
        match repos.products().find_by_id(item.product_id).await? {
            Some(product) => lines.push(CartLine {
                item_id: item.id,
                product_id: product.id,
                line_total: product
                    .price
                    .try_multiply(item.quantity)
                    .ok_or(CommerceError::Overflow)?,
                sku: product.sku,
                name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
                available: product.quantity,
            }),
            None => stale.push(item.id),
        }
    }
    for item_id in &stale {
        tracing::info!(%item_id, "dropping cart line for deleted product");
        repos.carts().remove_item(*item_id).await?;
    }
    cart.items.retain(|i| !stale.contains(&i.id));

    let mut coupon = None;
    let mut coupon_issue = None;
    if let Some(coupon_id) = cart.coupon_id {
        match repos.coupons().find_by_id(coupon_id).await? {
            Some(found) => {
                if let Err(err) = CouponValidator::check(&found, now) {
                    coupon_issue = Some(err.to_string());
                }
                coupon = Some(found);
            }
            None => {
                repos.carts().set_coupon(cart.id, None, now).await?;
                cart.coupon_id = None;
            }
        }
    }

    let line_totals: Vec<Money> = lines.iter().map(|l| l.line_total).collect();
    let discount = coupon
        .as_ref()
        .filter(|_| coupon_issue.is_none())
        .map(|c| c.discount);
    let pricing = CartPricing::compute(&line_totals, discount.as_ref(), currency)?;

    Ok(CartView {
        cart,
        lines,
        coupon,
        coupon_issue,
        pricing,
    })
}
