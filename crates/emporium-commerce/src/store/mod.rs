//! Storage capability set.
//!
//! One repository trait per aggregate, a [`Repositories`] bundle that binds
//! them to one transaction, and a [`Store`] that opens those
//! transactions and hands out a non-transactional [`Reader`].
//!
//! Repositories return `Option` for lookups and leave business errors to the
//! services. Soft-deleted categories, products and coupons are invisible to
//! every lookup.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod unit_of_work;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use unit_of_work::UnitOfWork;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cart::{Cart, CartItem};
use crate::catalog::{Category, Product, ProductFilter};
use crate::coupon::Coupon;
use crate::ids::{CartId, CartItemId, CategoryId, CouponId, OrderId, ProductId, UserId};
use crate::order::{Order, OrderStatus, StatusChange};
use crate::CommerceError;

/// Category rows.
#[async_trait]
pub trait CategoryRepository: Send {
    /// Fails with `DuplicateCategoryName` if a live category has the name.
    async fn insert(&mut self, category: &Category) -> Result<(), CommerceError>;

    async fn find_by_id(&mut self, id: CategoryId) -> Result<Option<Category>, CommerceError>;

    /// Persist name and description. Same uniqueness rule as `insert`.
    async fn update(&mut self, category: &Category) -> Result<(), CommerceError>;

    async fn soft_delete(&mut self, id: CategoryId, now: DateTime<Utc>) -> Result<bool, CommerceError>;
}

/// Product rows.
#[async_trait]
pub trait ProductRepository: Send {
    /// Insert a product. Fails with `DuplicateSku` if a live product has the SKU.
    async fn insert(&mut self, product: &Product) -> Result<(), CommerceError>;

    async fn find_by_id(&mut self, id: ProductId) -> Result<Option<Product>, CommerceError>;

    /// Like `find_by_id`, but holds the row against concurrent writers until
    /// the transaction ends.
    async fn find_for_update(&mut self, id: ProductId) -> Result<Option<Product>, CommerceError>;

    async fn set_quantity(
        &mut self,
        id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError>;

    /// Persist descriptive fields (sku, name, description, category, price).
    async fn update(&mut self, product: &Product) -> Result<(), CommerceError>;

    /// Returns false if there was no live product to delete.
    async fn soft_delete(&mut self, id: ProductId, now: DateTime<Utc>) -> Result<bool, CommerceError>;
}

/// Carts and their items.
#[async_trait]
pub trait CartRepository: Send {
    /// The user's cart, created empty if missing. Safe under concurrent
    /// first access by the same user. The cart row is held until the
    /// transaction ends.
    async fn get_or_create(&mut self, user_id: UserId, now: DateTime<Utc>) -> Result<Cart, CommerceError>;

    async fn find_by_user(&mut self, user_id: UserId) -> Result<Option<Cart>, CommerceError>;

    /// Like `find_by_user`, but holds the cart row until the transaction
    /// ends. Items are read after the row is held.
    async fn find_by_user_for_update(&mut self, user_id: UserId) -> Result<Option<Cart>, CommerceError>;

    /// Add `quantity` of a product, merging into an existing line.
    async fn add_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<CartItem, CommerceError>;

    async fn find_item(&mut self, item_id: CartItemId) -> Result<Option<CartItem>, CommerceError>;

    /// Overwrite a line's quantity (no merge).
    async fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CommerceError>;

    async fn remove_item(&mut self, item_id: CartItemId) -> Result<(), CommerceError>;

    /// Delete every item; the cart row stays.
    async fn clear(&mut self, cart_id: CartId) -> Result<(), CommerceError>;

    async fn set_coupon(
        &mut self,
        cart_id: CartId,
        coupon_id: Option<CouponId>,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError>;
}

/// Coupons.
#[async_trait]
pub trait CouponRepository: Send {
    /// Fails with `DuplicateCouponCode` if a live coupon has the code.
    async fn insert(&mut self, coupon: &Coupon) -> Result<(), CommerceError>;

    async fn find_by_id(&mut self, id: CouponId) -> Result<Option<Coupon>, CommerceError>;

    async fn find_by_code(&mut self, code: &str) -> Result<Option<Coupon>, CommerceError>;

    /// Persist the editable fields.
    async fn update(&mut self, coupon: &Coupon) -> Result<(), CommerceError>;

    /// Count one use if the limit allows it. Returns false when exhausted.
    async fn increment_usage(&mut self, id: CouponId, now: DateTime<Utc>) -> Result<bool, CommerceError>;

    async fn soft_delete(&mut self, id: CouponId, now: DateTime<Utc>) -> Result<bool, CommerceError>;
}

/// Orders with their items.
#[async_trait]
pub trait OrderRepository: Send {
    async fn insert(&mut self, order: &Order) -> Result<(), CommerceError>;

    async fn find_by_id(&mut self, id: OrderId) -> Result<Option<Order>, CommerceError>;

    /// Like `find_by_id`, but holds the order row until the transaction ends.
    async fn find_for_update(&mut self, id: OrderId) -> Result<Option<Order>, CommerceError>;

    async fn update_status(&mut self, id: OrderId, change: &StatusChange) -> Result<(), CommerceError>;
}

/// Every repository, bound to one transaction.
pub trait Repositories: Send {
    fn categories(&mut self) -> &mut dyn CategoryRepository;
    fn products(&mut self) -> &mut dyn ProductRepository;
    fn carts(&mut self) -> &mut dyn CartRepository;
    fn coupons(&mut self) -> &mut dyn CouponRepository;
    fn orders(&mut self) -> &mut dyn OrderRepository;
}

/// An open transaction.
///
/// Dropping a scope without committing discards its writes.
#[async_trait]
pub trait TransactionScope: Send {
    fn repos(&mut self) -> &mut dyn Repositories;

    async fn commit(self: Box<Self>) -> Result<(), CommerceError>;

    async fn rollback(self: Box<Self>) -> Result<(), CommerceError>;
}

/// Read-only access outside any transaction. Results may be slightly stale.
#[async_trait]
pub trait Reader: Send + Sync {
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, CommerceError>;

    /// Live categories ordered by name.
    async fn categories(&self) -> Result<Vec<Category>, CommerceError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, CommerceError>;

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CommerceError>;

    async fn coupon(&self, id: CouponId) -> Result<Option<Coupon>, CommerceError>;

    /// Live coupons ordered by code.
    async fn coupons(&self) -> Result<Vec<Coupon>, CommerceError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, CommerceError>;

    /// A user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, CommerceError>;

    /// All orders, newest first, optionally by status.
    async fn orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, CommerceError>;
}

/// A backing store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TransactionScope>, CommerceError>;

    fn reader(&self) -> &dyn Reader;
}
