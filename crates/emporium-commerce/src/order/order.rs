//! Order aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartPricing;
use crate::catalog::Product;
use crate::ids::{AddressId, OrderId, OrderItemId, ProductId, UserId};
use crate::money::Money;
use crate::order::OrderStatus;
use crate::CommerceError;

/// A placed order.
///
/// Items and amounts are frozen at checkout. Afterwards only the status,
/// tracking number and payment method change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_address_id: AddressId,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount: Money,
    /// `max(subtotal - discount, 0)`.
    pub total: Money,
    /// Code of the coupon applied at checkout.
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A new pending order.
    pub fn place(
        user_id: UserId,
        shipping_address_id: AddressId,
        items: Vec<OrderItem>,
        pricing: &CartPricing,
        coupon_code: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            user_id,
            shipping_address_id,
            items,
            subtotal: pricing.subtotal,
            discount: pricing.discount,
            total: pricing.grand_total,
            coupon_code,
            status: OrderStatus::Pending,
            tracking_number: None,
            payment_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate a move to `next` and describe the write.
    pub fn transition(
        &self,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, CommerceError> {
        let status = self.status.transition(next)?;
        Ok(StatusChange {
            status,
            tracking_number: None,
            payment_method: None,
            updated_at: now,
        })
    }

    /// Apply a change in memory.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        if let Some(tracking) = &change.tracking_number {
            self.tracking_number = Some(tracking.clone());
        }
        if let Some(method) = &change.payment_method {
            self.payment_method = Some(method.clone());
        }
        self.updated_at = change.updated_at;
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A frozen order line. Price and descriptive fields are copies taken at
/// checkout, not references to the live product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Unit price at purchase.
    pub price: Money,
}

impl OrderItem {
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        Self {
            id: OrderItemId::generate(),
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            quantity,
            price: product.price,
        }
    }

    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

/// A status write. Optional fields are left untouched when `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub payment_method: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusChange {
    pub fn with_tracking_number(mut self, tracking: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking.into());
        self
    }

    pub fn with_payment_method(mut self, method: Option<String>) -> Self {
        self.payment_method = method;
        self
    }
}

/// Status notification from the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentWebhook {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl PaymentWebhook {
    pub fn from_json(payload: &str) -> Result<Self, CommerceError> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;
    use crate::money::Currency;

    fn product(cents: i64) -> Product {
        NewProduct {
            sku: "TEA-01".into(),
            name: "Green Tea".into(),
            description: None,
            category_id: None,
            price: Money::new(cents, Currency::USD),
            quantity: 10,
        }
        .into_product(Utc::now())
    }

    fn order() -> Order {
        let item = OrderItem::snapshot(&product(1000), 2);
        let pricing = CartPricing {
            subtotal: Money::new(2000, Currency::USD),
            discount: Money::zero(Currency::USD),
            grand_total: Money::new(2000, Currency::USD),
        };
        Order::place(
            UserId::generate(),
            AddressId::generate(),
            vec![item],
            &pricing,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_snapshot_is_independent_of_product() {
        let mut live = product(1000);
        let item = OrderItem::snapshot(&live, 3);
        live.price = Money::new(5000, Currency::USD);
        live.name = "Renamed".into();

        assert_eq!(item.price.amount_cents, 1000);
        assert_eq!(item.name, "Green Tea");
        assert_eq!(item.line_total().unwrap().amount_cents, 3000);
    }

    #[test]
    fn test_place_starts_pending() {
        let order = order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total.amount_cents, 2000);
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn test_transition_and_apply() {
        let mut order = order();
        assert!(order.transition(OrderStatus::Shipped, Utc::now()).is_err());

        let change = order
            .transition(OrderStatus::Processing, Utc::now())
            .unwrap()
            .with_payment_method(Some("card".into()));
        order.apply(&change);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_method.as_deref(), Some("card"));

        let change = order
            .transition(OrderStatus::Shipped, Utc::now())
            .unwrap()
            .with_tracking_number("1Z999");
        order.apply(&change);
        assert_eq!(order.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(order.payment_method.as_deref(), Some("card"));
    }

    #[test]
    fn test_webhook_payload() {
        let id = OrderId::generate();
        let payload = format!(
            r#"{{"order_id":"{}","status":"processing","payment_method":"card"}}"#,
            id
        );
        let webhook = PaymentWebhook::from_json(&payload).unwrap();
        assert_eq!(webhook.order_id, id);
        assert_eq!(webhook.status, OrderStatus::Processing);

        assert!(matches!(
            PaymentWebhook::from_json("{}"),
            Err(CommerceError::Validation(_))
        ));
    }
}
