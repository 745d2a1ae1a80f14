//! Order lifecycle and order reads.

use chrono::{DateTime, Utc};

use crate::auth::Actor;
use crate::catalog::StockLedger;
use crate::ids::OrderId;
use crate::order::{Order, OrderItem, OrderStatus, PaymentWebhook};
use crate::service::ServiceContext;
use crate::store::ProductRepository;
use crate::CommerceError;

/// Moves orders through their lifecycle.
///
/// Every transition is its own unit of work that reloads the order and checks
/// the current status before writing.
#[derive(Clone)]
pub struct OrderService {
    ctx: ServiceContext,
}

impl OrderService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// `pending -> processing`, recording how the order was paid.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        actor: &Actor,
        order_id: OrderId,
        payment_method: Option<String>,
    ) -> Result<Order, CommerceError> {
        actor.require_staff("confirming payment")?;
        let payment_method = payment_method.filter(|m| !m.trim().is_empty());
        self.transition(actor, order_id, OrderStatus::Processing, None, payment_method)
            .await
    }

    /// `processing -> shipped`.
    #[tracing::instrument(skip(self))]
    pub async fn ship(
        &self,
        actor: &Actor,
        order_id: OrderId,
        tracking_number: &str,
    ) -> Result<Order, CommerceError> {
        actor.require_staff("shipping orders")?;
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(CommerceError::validation("tracking number must not be empty"));
        }
        self.transition(
            actor,
            order_id,
            OrderStatus::Shipped,
            Some(tracking_number.to_string()),
            None,
        )
        .await
    }

    /// `shipped -> completed`.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, actor: &Actor, order_id: OrderId) -> Result<Order, CommerceError> {
        actor.require_staff("completing orders")?;
        self.transition(actor, order_id, OrderStatus::Completed, None, None)
            .await
    }

    /// Cancel a pending or processing order and put its stock back.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, actor: &Actor, order_id: OrderId) -> Result<Order, CommerceError> {
        self.transition(actor, order_id, OrderStatus::Cancelled, None, None)
            .await
    }

    /// Apply a payment provider notification.
    ///
    /// A payment provider can only mark an order paid (`processing`) or
    /// `cancelled`; shipping and completion go through [`Self::ship`] and
    /// [`Self::complete`]. The requested status must also be one legal step
    /// from the order's current status.
    #[tracing::instrument(skip(self, webhook), fields(order_id = %webhook.order_id, status = %webhook.status))]
    pub async fn apply_payment_webhook(
        &self,
        actor: &Actor,
        webhook: PaymentWebhook,
    ) -> Result<Order, CommerceError> {
        actor.require_staff("applying payment webhooks")?;
        if !matches!(
            webhook.status,
            OrderStatus::Processing | OrderStatus::Cancelled
        ) {
            return Err(CommerceError::validation(format!(
                "payment webhooks cannot move an order to {}",
                webhook.status
            )));
        }
        self.transition(
            actor,
            webhook.order_id,
            webhook.status,
            None,
            webhook.payment_method,
        )
        .await
    }

    /// One order, visible to its owner and to staff.
    pub async fn order(&self, actor: &Actor, order_id: OrderId) -> Result<Order, CommerceError> {
        let order = self
            .ctx
            .uow
            .reader()
            .order(order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        if !actor.can_access(order.user_id) {
            return Err(CommerceError::OrderAccessDenied(order_id));
        }
        Ok(order)
    }

    /// The actor's own orders, newest first.
    pub async fn my_orders(&self, actor: &Actor) -> Result<Vec<Order>, CommerceError> {
        self.ctx.uow.reader().orders_for_user(actor.user_id).await
    }

    /// Every order, newest first. Staff only.
    pub async fn all_orders(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CommerceError> {
        actor.require_staff("listing all orders")?;
        self.ctx.uow.reader().orders(status).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        order_id: OrderId,
        target: OrderStatus,
        tracking_number: Option<String>,
        payment_method: Option<String>,
    ) -> Result<Order, CommerceError> {
        let actor = *actor;
        let now = self.ctx.clock.now();

        let (order, from) = self
            .ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let mut order = repos
                        .orders()
                        .find_for_update(order_id)
                        .await?
                        .ok_or(CommerceError::OrderNotFound(order_id))?;
                    if !actor.can_access(order.user_id) {
                        return Err(CommerceError::OrderAccessDenied(order_id));
                    }

                    let from = order.status;
                    let mut change = order
                        .transition(target, now)?
                        .with_payment_method(payment_method);
                    if let Some(tracking) = tracking_number {
                        change = change.with_tracking_number(tracking);
                    }

                    if target == OrderStatus::Cancelled {
                        restock(repos.products(), &order.items, now).await?;
                    }

                    repos.orders().update_status(order_id, &change).await?;
                    order.apply(&change);
                    Ok((order, from))
                })
            })
            .await?;

        tracing::info!(%order_id, %from, to = %order.status, "order status changed");
        Ok(order)
    }
}

/// Return a cancelled order's units to stock. Lines whose product has since
/// been deleted are skipped.
async fn restock(
    products: &mut dyn ProductRepository,
    items: &[OrderItem],
    now: DateTime<Utc>,
) -> Result<(), CommerceError> {
    for item in items {
        match StockLedger::release(products, item.product_id, item.quantity, now).await {
            Ok(_) => {}
            Err(CommerceError::ProductNotFound(product_id)) => {
                tracing::warn!(%product_id, "not restocking deleted product");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
