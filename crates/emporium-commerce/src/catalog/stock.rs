//! The stock ledger.
//!
//! All stock movement goes through here, and only from inside an open unit
//! of work. `reserve` reads the product with
//! [`ProductRepository::find_for_update`], which must serialize concurrent
//! reservations of the same row (a row lock in Postgres, the scope lock in
//! memory). Without that two checkouts could both see the last unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::ids::ProductId;
use crate::store::ProductRepository;
use crate::CommerceError;

/// Result of a successful reservation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockReservation {
    /// The product as it was read under lock, before the decrement.
    pub product: Product,
    pub reserved: i64,
    pub remaining: i64,
}

/// Authoritative per-product sellable quantity.
pub struct StockLedger;

impl StockLedger {
    /// Current quantity of a live product.
    pub async fn available(
        products: &mut dyn ProductRepository,
        product_id: ProductId,
    ) -> Result<i64, CommerceError> {
        products
            .find_by_id(product_id)
            .await?
            .map(|p| p.quantity)
            .ok_or(CommerceError::ProductNotFound(product_id))
    }

    /// Take `requested` units out of stock.
    pub async fn reserve(
        products: &mut dyn ProductRepository,
        product_id: ProductId,
        requested: i64,
        now: DateTime<Utc>,
    ) -> Result<StockReservation, CommerceError> {
        if requested < 1 {
            return Err(CommerceError::InvalidQuantity(requested));
        }

        let product = products
            .find_for_update(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        if requested > product.quantity {
            return Err(CommerceError::OutOfStock {
                product: product.name.clone(),
                available: product.quantity,
                requested,
            });
        }

        let remaining = product.quantity - requested;
        products.set_quantity(product_id, remaining, now).await?;

        tracing::debug!(%product_id, requested, remaining, "stock reserved");
        Ok(StockReservation {
            product,
            reserved: requested,
            remaining,
        })
    }

    /// Put `quantity` units back, for restocks and cancelled orders.
    /// Returns the new quantity.
    pub async fn release(
        products: &mut dyn ProductRepository,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let product = products
            .find_for_update(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        let updated = product
            .quantity
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;
        products.set_quantity(product_id, updated, now).await?;

        tracing::debug!(%product_id, quantity, updated, "stock released");
        Ok(updated)
    }
}
