//! Commerce error types.

use thiserror::Error;

use crate::ids::{CartItemId, CategoryId, CouponId, OrderId, ProductId};
use crate::order::OrderStatus;

/// Message carried by `PersistenceFailure` for driver-level errors.
pub const STORAGE_ERROR: &str = "storage error";

/// Errors produced by the commerce core.
///
/// Business-rule variants carry enough detail for the request layer to render
/// a precise response. Storage problems are flattened into
/// [`CommerceError::PersistenceFailure`] so driver types never leak.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found (or soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Category not found (or soft-deleted).
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Another live category already uses this name.
    #[error("Category name already exists: {0}")]
    DuplicateCategoryName(String),

    /// Not enough sellable stock to satisfy a request.
    #[error("Out of stock: {product} has {available} available, {requested} requested")]
    OutOfStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Checkout was attempted on a cart with no items.
    #[error("Cart is empty")]
    CartIsEmpty,

    /// Item is not in the acting user's cart.
    #[error("Cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// No live coupon with this code or id.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Coupon is inactive or past its expiry date.
    #[error("Coupon expired: {0}")]
    CouponExpired(String),

    /// Coupon has been used as many times as it allows.
    #[error("Coupon usage limit reached: {0}")]
    CouponUsageLimitReached(String),

    /// Another live coupon already uses this code.
    #[error("Coupon code already exists: {0}")]
    DuplicateCouponCode(String),

    /// Another live product already uses this SKU.
    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Actor may not see or change this order.
    #[error("Access to order {0} denied")]
    OrderAccessDenied(OrderId),

    /// Operation requires a role the actor does not hold.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested status change is not a legal transition.
    #[error("Invalid order status transition from {from} to {to}")]
    InvalidOrderStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow in a money calculation.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unit of work was opened from inside another one.
    #[error("Unit of work cannot be nested")]
    NestedUnitOfWork,

    /// Infrastructure failure in the storage layer.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

/// Coarse classification of [`CommerceError`] for the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Forbidden,
    Internal,
}

impl ErrorKind {
    /// HTTP status code conventionally used for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Invalid => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Internal => 500,
        }
    }
}

impl CommerceError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use CommerceError::*;
        match self {
            ProductNotFound(_)
            | CategoryNotFound(_)
            | CartItemNotFound(_)
            | CouponNotFound(_)
            | OrderNotFound(_) => ErrorKind::NotFound,
            OutOfStock { .. }
            | DuplicateCategoryName(_)
            | CouponUsageLimitReached(_)
            | DuplicateCouponCode(_)
            | DuplicateSku(_)
            | InvalidOrderStatusTransition { .. } => ErrorKind::Conflict,
            CartIsEmpty
            | CouponExpired(_)
            | InvalidQuantity(_)
            | CurrencyMismatch { .. }
            | Validation(_) => ErrorKind::Invalid,
            OrderAccessDenied(_) | Forbidden(_) => ErrorKind::Forbidden,
            Overflow | NestedUnitOfWork | PersistenceFailure(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error comes from infrastructure rather than a business rule.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        CommerceError::Validation(message.into())
    }

    /// Wrap a storage failure. The detail is logged, never returned.
    pub(crate) fn storage(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "storage failure");
        CommerceError::PersistenceFailure(STORAGE_ERROR.to_string())
    }

    pub(crate) fn coupon_not_found(id: &CouponId) -> Self {
        CommerceError::CouponNotFound(id.to_string())
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Validation(format!("malformed payload: {}", e))
    }
}

#[cfg(feature = "postgres")]
impl From<emporium_db::DbError> for CommerceError {
    fn from(e: emporium_db::DbError) -> Self {
        CommerceError::storage(e)
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self {
        CommerceError::storage(e)
    }
}
