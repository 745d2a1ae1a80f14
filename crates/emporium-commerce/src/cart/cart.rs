//! Cart aggregate types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CartId, CartItemId, CouponId, ProductId, UserId};
use crate::CommerceError;

/// A user's cart. Exactly one per user; emptied, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// Lines in the order they were first added.
    pub items: Vec<CartItem>,
    pub coupon_id: Option<CouponId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            items: Vec::new(),
            coupon_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// One product line in a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// At least 1.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Quantity a line ends up with after adding `added` to `existing`, capped
/// at `max_per_item`.
pub fn merged_quantity(existing: i64, added: i64, max_per_item: i64) -> Result<i64, CommerceError> {
    if added < 1 {
        return Err(CommerceError::InvalidQuantity(added));
    }
    let merged = existing.checked_add(added).ok_or(CommerceError::Overflow)?;
    if merged > max_per_item {
        return Err(CommerceError::validation(format!(
            "quantity {} exceeds the per-item limit of {}",
            merged, max_per_item
        )));
    }
    Ok(merged)
}
