//! Product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CategoryId, ProductId};
use crate::money::{Currency, Money};
use crate::CommerceError;

/// A sellable product and its stock counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    /// Stock keeping unit, unique among live products.
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Current list price. Orders copy it at checkout.
    pub price: Money,
    /// Sellable units. Never negative; only changed through the stock ledger.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the product is soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub price: Money,
    #[serde(default)]
    pub quantity: i64,
}

impl NewProduct {
    pub fn validate(&self, currency: Currency) -> Result<(), CommerceError> {
        validate_sku(&self.sku)?;
        validate_name(&self.name)?;
        validate_price(&self.price, currency)?;
        if self.quantity < 0 {
            return Err(CommerceError::InvalidQuantity(self.quantity));
        }
        Ok(())
    }

    /// Build the stored product. Call [`NewProduct::validate`] first.
    pub fn into_product(self, now: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::generate(),
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            category_id: self.category_id,
            price: self.price,
            quantity: self.quantity,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// The fields of a product that may be edited after creation.
///
/// Stock is deliberately absent: quantities move through the ledger only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Option<Money>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.price.is_none()
    }

    pub fn validate(&self, currency: Currency) -> Result<(), CommerceError> {
        if self.is_empty() {
            return Err(CommerceError::validation("patch has no fields to update"));
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = &self.price {
            validate_price(price, currency)?;
        }
        Ok(())
    }

    /// Apply a validated patch.
    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(sku) = self.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            product.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        product.updated_at = now;
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive match against name or SKU.
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    #[serde(default)]
    pub in_stock_only: bool,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl ProductFilter {
    /// Whether a live product passes every predicate (paging aside).
    pub fn matches(&self, product: &Product) -> bool {
        if product.is_deleted() {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.sku.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.category_id.is_some() && product.category_id != self.category_id {
            return false;
        }
        if let Some(min) = &self.min_price {
            if product.price.amount_cents < min.amount_cents {
                return false;
            }
        }
        if let Some(max) = &self.max_price {
            if product.price.amount_cents > max.amount_cents {
                return false;
            }
        }
        !self.in_stock_only || product.in_stock()
    }
}

fn validate_sku(sku: &str) -> Result<(), CommerceError> {
    let sku = sku.trim();
    if sku.is_empty() {
        return Err(CommerceError::validation("sku must not be empty"));
    }
    if sku.chars().any(char::is_whitespace) {
        return Err(CommerceError::validation("sku must not contain whitespace"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), CommerceError> {
    if name.trim().is_empty() {
        return Err(CommerceError::validation("name must not be empty"));
    }
    Ok(())
}

fn validate_price(price: &Money, currency: Currency) -> Result<(), CommerceError> {
    if price.currency != currency {
        return Err(CommerceError::CurrencyMismatch {
            expected: currency.to_string(),
            got: price.currency.to_string(),
        });
    }
    if price.is_negative() {
        return Err(CommerceError::validation("price must not be negative"));
    }
    Ok(())
}
