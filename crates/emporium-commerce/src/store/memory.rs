//! In-memory store.
//!
//! Write transactions are serialized by one async mutex held for the whole
//! scope. Each scope works on a private copy of the tables that replaces the
//! published copy on commit and is dropped on rollback. Readers only ever see
//! the published copy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::cart::{Cart, CartItem};
use crate::catalog::{Category, Product, ProductFilter};
use crate::coupon::Coupon;
use crate::ids::{CartId, CartItemId, CategoryId, CouponId, OrderId, ProductId, UserId};
use crate::order::{Order, OrderStatus, StatusChange};
use crate::store::{
    CartRepository, CategoryRepository, CouponRepository, OrderRepository, ProductRepository,
    Reader, Repositories, Store, TransactionScope,
};
use crate::CommerceError;

#[derive(Debug, Clone, Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    cart_by_user: HashMap<UserId, CartId>,
    coupons: HashMap<CouponId, Coupon>,
    orders: HashMap<OrderId, Order>,
}

impl Tables {
    fn live_category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id).filter(|c| !c.is_deleted())
    }

    fn category_name_taken(&self, category: &Category) -> bool {
        self.categories
            .values()
            .any(|c| !c.is_deleted() && c.id != category.id && c.name == category.name)
    }

    fn live_product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).filter(|p| !p.is_deleted())
    }

    fn live_coupon(&self, id: CouponId) -> Option<&Coupon> {
        self.coupons.get(&id).filter(|c| c.deleted_at.is_none())
    }

    fn cart_of_item(&mut self, item_id: CartItemId) -> Option<&mut Cart> {
        self.carts
            .values_mut()
            .find(|cart| cart.item(item_id).is_some())
    }
}

type Published = Arc<RwLock<Arc<Tables>>>;

fn snapshot(published: &Published) -> Arc<Tables> {
    published
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// A [`Store`] kept entirely in process memory.
pub struct MemoryStore {
    published: Published,
    write_lock: Arc<Mutex<()>>,
    fail_order_inserts: Arc<AtomicBool>,
    reader: MemoryReader,
}

impl MemoryStore {
    pub fn new() -> Self {
        let published: Published = Arc::default();
        Self {
            reader: MemoryReader {
                published: published.clone(),
            },
            published,
            write_lock: Arc::new(Mutex::new(())),
            fail_order_inserts: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent order insert fail with a persistence error.
    pub fn fail_order_inserts(&self, fail: bool) {
        self.fail_order_inserts.store(fail, Ordering::SeqCst);
    }

    /// Publish a product directly. Waits for any open scope to finish.
    pub async fn seed_product(&self, product: Product) {
        self.modify(|tables| {
            tables.products.insert(product.id, product);
        })
        .await;
    }

    /// Publish a coupon directly. Waits for any open scope to finish.
    pub async fn seed_coupon(&self, coupon: Coupon) {
        self.modify(|tables| {
            tables.coupons.insert(coupon.id, coupon);
        })
        .await;
    }

    /// Number of orders ever committed.
    pub fn order_count(&self) -> usize {
        snapshot(&self.published).orders.len()
    }

    async fn modify(&self, f: impl FnOnce(&mut Tables)) {
        let _guard = self.write_lock.lock().await;
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        let mut tables = (**published).clone();
        f(&mut tables);
        *published = Arc::new(tables);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn TransactionScope>, CommerceError> {
        let guard = self.write_lock.clone().lock_owned().await;
        let working = (*snapshot(&self.published)).clone();
        Ok(Box::new(MemoryScope {
            _guard: guard,
            working,
            published: self.published.clone(),
            fail_order_inserts: self.fail_order_inserts.load(Ordering::SeqCst),
        }))
    }

    fn reader(&self) -> &dyn Reader {
        &self.reader
    }
}

struct MemoryScope {
    _guard: OwnedMutexGuard<()>,
    working: Tables,
    published: Published,
    fail_order_inserts: bool,
}

#[async_trait]
impl TransactionScope for MemoryScope {
    fn repos(&mut self) -> &mut dyn Repositories {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), CommerceError> {
        let scope = *self;
        let mut published = scope
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *published = Arc::new(scope.working);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CommerceError> {
        Ok(())
    }
}

impl Repositories for MemoryScope {
    fn categories(&mut self) -> &mut dyn CategoryRepository {
        self
    }

    fn products(&mut self) -> &mut dyn ProductRepository {
        self
    }

    fn carts(&mut self) -> &mut dyn CartRepository {
        self
    }

    fn coupons(&mut self) -> &mut dyn CouponRepository {
        self
    }

    fn orders(&mut self) -> &mut dyn OrderRepository {
        self
    }
}

#[async_trait]
impl CategoryRepository for MemoryScope {
    async fn insert(&mut self, category: &Category) -> Result<(), CommerceError> {
        if self.working.category_name_taken(category) {
            return Err(CommerceError::DuplicateCategoryName(category.name.clone()));
        }
        self.working.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn find_by_id(&mut self, id: CategoryId) -> Result<Option<Category>, CommerceError> {
        Ok(self.working.live_category(id).cloned())
    }

    async fn update(&mut self, category: &Category) -> Result<(), CommerceError> {
        if self.working.category_name_taken(category) {
            return Err(CommerceError::DuplicateCategoryName(category.name.clone()));
        }
        let stored = self
            .working
            .categories
            .get_mut(&category.id)
            .filter(|c| !c.is_deleted())
            .ok_or(CommerceError::CategoryNotFound(category.id))?;
        stored.name = category.name.clone();
        stored.description = category.description.clone();
        stored.updated_at = category.updated_at;
        Ok(())
    }

    async fn soft_delete(&mut self, id: CategoryId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        match self.working.categories.get_mut(&id).filter(|c| !c.is_deleted()) {
            Some(category) => {
                category.deleted_at = Some(now);
                category.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryScope {
    async fn insert(&mut self, product: &Product) -> Result<(), CommerceError> {
        let taken = self
            .working
            .products
            .values()
            .any(|p| !p.is_deleted() && p.sku == product.sku);
        if taken {
            return Err(CommerceError::DuplicateSku(product.sku.clone()));
        }
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_by_id(&mut self, id: ProductId) -> Result<Option<Product>, CommerceError> {
        Ok(self.working.live_product(id).cloned())
    }

    async fn find_for_update(&mut self, id: ProductId) -> Result<Option<Product>, CommerceError> {
        // The scope already holds the store-wide write lock.
        Ok(self.working.live_product(id).cloned())
    }

    async fn set_quantity(
        &mut self,
        id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::PersistenceFailure(
                "products.quantity must not be negative".to_string(),
            ));
        }
        let product = self
            .working
            .products
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or(CommerceError::ProductNotFound(id))?;
        product.quantity = quantity;
        product.updated_at = now;
        Ok(())
    }

    async fn update(&mut self, product: &Product) -> Result<(), CommerceError> {
        let taken = self
            .working
            .products
            .values()
            .any(|p| !p.is_deleted() && p.id != product.id && p.sku == product.sku);
        if taken {
            return Err(CommerceError::DuplicateSku(product.sku.clone()));
        }
        let stored = self
            .working
            .products
            .get_mut(&product.id)
            .filter(|p| !p.is_deleted())
            .ok_or(CommerceError::ProductNotFound(product.id))?;
        stored.sku = product.sku.clone();
        stored.name = product.name.clone();
        stored.description = product.description.clone();
        stored.category_id = product.category_id;
        stored.price = product.price;
        stored.updated_at = product.updated_at;
        Ok(())
    }

    async fn soft_delete(&mut self, id: ProductId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        match self.working.products.get_mut(&id).filter(|p| !p.is_deleted()) {
            Some(product) => {
                product.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CartRepository for MemoryScope {
    async fn get_or_create(&mut self, user_id: UserId, now: DateTime<Utc>) -> Result<Cart, CommerceError> {
        if let Some(cart) = self
            .working
            .cart_by_user
            .get(&user_id)
            .and_then(|id| self.working.carts.get(id))
        {
            return Ok(cart.clone());
        }
        let cart = Cart::new(user_id, now);
        self.working.cart_by_user.insert(user_id, cart.id);
        self.working.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_by_user(&mut self, user_id: UserId) -> Result<Option<Cart>, CommerceError> {
        Ok(self
            .working
            .cart_by_user
            .get(&user_id)
            .and_then(|id| self.working.carts.get(id))
            .cloned())
    }

    async fn find_by_user_for_update(&mut self, user_id: UserId) -> Result<Option<Cart>, CommerceError> {
        self.find_by_user(user_id).await
    }

    async fn add_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<CartItem, CommerceError> {
        let cart = self
            .working
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| CommerceError::PersistenceFailure(format!("cart {} missing", cart_id)))?;

        if let Some(item) = cart.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?;
            cart.updated_at = now;
            return Ok(item.clone());
        }

        let item = CartItem {
            id: CartItemId::generate(),
            cart_id,
            product_id,
            quantity,
            created_at: now,
        };
        cart.items.push(item.clone());
        cart.updated_at = now;
        Ok(item)
    }

    async fn find_item(&mut self, item_id: CartItemId) -> Result<Option<CartItem>, CommerceError> {
        Ok(self
            .working
            .cart_of_item(item_id)
            .and_then(|cart| cart.item(item_id).cloned()))
    }

    async fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CommerceError> {
        if let Some(item) = self
            .working
            .cart_of_item(item_id)
            .and_then(|cart| cart.items.iter_mut().find(|i| i.id == item_id))
        {
            item.quantity = quantity;
        }
        Ok(())
    }

    async fn remove_item(&mut self, item_id: CartItemId) -> Result<(), CommerceError> {
        if let Some(cart) = self.working.cart_of_item(item_id) {
            cart.items.retain(|i| i.id != item_id);
        }
        Ok(())
    }

    async fn clear(&mut self, cart_id: CartId) -> Result<(), CommerceError> {
        if let Some(cart) = self.working.carts.get_mut(&cart_id) {
            cart.items.clear();
        }
        Ok(())
    }

    async fn set_coupon(
        &mut self,
        cart_id: CartId,
        coupon_id: Option<CouponId>,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        if let Some(cart) = self.working.carts.get_mut(&cart_id) {
            cart.coupon_id = coupon_id;
            cart.updated_at = now;
        }
        Ok(())
    }
}

#[async_trait]
impl CouponRepository for MemoryScope {
    async fn insert(&mut self, coupon: &Coupon) -> Result<(), CommerceError> {
        let taken = self
            .working
            .coupons
            .values()
            .any(|c| c.deleted_at.is_none() && c.code == coupon.code);
        if taken {
            return Err(CommerceError::DuplicateCouponCode(coupon.code.clone()));
        }
        self.working.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn find_by_id(&mut self, id: CouponId) -> Result<Option<Coupon>, CommerceError> {
        Ok(self.working.live_coupon(id).cloned())
    }

    async fn find_by_code(&mut self, code: &str) -> Result<Option<Coupon>, CommerceError> {
        Ok(self
            .working
            .coupons
            .values()
            .find(|c| c.deleted_at.is_none() && c.code == code)
            .cloned())
    }

    async fn update(&mut self, coupon: &Coupon) -> Result<(), CommerceError> {
        let stored = self
            .working
            .coupons
            .get_mut(&coupon.id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| CommerceError::coupon_not_found(&coupon.id))?;
        stored.discount = coupon.discount;
        stored.expires_at = coupon.expires_at;
        stored.usage_limit = coupon.usage_limit;
        stored.is_active = coupon.is_active;
        stored.updated_at = coupon.updated_at;
        Ok(())
    }

    async fn increment_usage(&mut self, id: CouponId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        match self
            .working
            .coupons
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none() && c.usage_count < c.usage_limit)
        {
            Some(coupon) => {
                coupon.usage_count += 1;
                coupon.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete(&mut self, id: CouponId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        match self
            .working
            .coupons
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
        {
            Some(coupon) => {
                coupon.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryScope {
    async fn insert(&mut self, order: &Order) -> Result<(), CommerceError> {
        if self.fail_order_inserts {
            return Err(CommerceError::PersistenceFailure(
                "order insert failed (injected)".to_string(),
            ));
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&mut self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn find_for_update(&mut self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn update_status(&mut self, id: OrderId, change: &StatusChange) -> Result<(), CommerceError> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or(CommerceError::OrderNotFound(id))?;
        order.apply(change);
        Ok(())
    }
}

struct MemoryReader {
    published: Published,
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

#[async_trait]
impl Reader for MemoryReader {
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, CommerceError> {
        Ok(snapshot(&self.published).live_category(id).cloned())
    }

    async fn categories(&self) -> Result<Vec<Category>, CommerceError> {
        let tables = snapshot(&self.published);
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| !c.is_deleted())
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, CommerceError> {
        Ok(snapshot(&self.published).live_product(id).cloned())
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CommerceError> {
        let tables = snapshot(&self.published);
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.sku.cmp(&b.sku)));
        Ok(products
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn coupon(&self, id: CouponId) -> Result<Option<Coupon>, CommerceError> {
        Ok(snapshot(&self.published).live_coupon(id).cloned())
    }

    async fn coupons(&self) -> Result<Vec<Coupon>, CommerceError> {
        let tables = snapshot(&self.published);
        let mut coupons: Vec<Coupon> = tables
            .coupons
            .values()
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .collect();
        coupons.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(coupons)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        Ok(snapshot(&self.published).orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, CommerceError> {
        let tables = snapshot(&self.published);
        Ok(newest_first(
            tables
                .orders
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, CommerceError> {
        let tables = snapshot(&self.published);
        Ok(newest_first(
            tables
                .orders
                .values()
                .filter(|o| status.map_or(true, |s| o.status == s))
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;
    use crate::money::{Currency, Money};

    fn product(sku: &str) -> Product {
        NewProduct {
            sku: sku.into(),
            name: format!("Product {}", sku),
            description: None,
            category_id: None,
            price: Money::new(100, Currency::USD),
            quantity: 1,
        }
        .into_product(Utc::now())
    }

    #[tokio::test]
    async fn test_rollback_discards_working_copy() {
        let store = MemoryStore::new();
        let p = product("A1");
        let id = p.id;

        let mut scope = store.begin().await.unwrap();
        scope.repos().products().insert(&p).await.unwrap();
        scope.rollback().await.unwrap();

        assert!(store.reader().product(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_scope_releases_lock() {
        let store = MemoryStore::new();
        {
            let _scope = store.begin().await.unwrap();
        }
        let scope = store.begin().await.unwrap();
        scope.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_sku_among_live_products() {
        let store = MemoryStore::new();
        let first = product("DUP");
        let first_id = first.id;
        store.seed_product(first).await;

        let mut scope = store.begin().await.unwrap();
        let err = scope
            .repos()
            .products()
            .insert(&product("DUP"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::DuplicateSku(_)));

        assert!(scope
            .repos()
            .products()
            .soft_delete(first_id, Utc::now())
            .await
            .unwrap());
        scope.repos().products().insert(&product("DUP")).await.unwrap();
        assert!(scope.repos().products().find_by_id(first_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_category_name_reusable_after_delete() {
        use crate::catalog::NewCategory;

        let store = MemoryStore::new();
        let lighting = || {
            NewCategory {
                name: "Lighting".into(),
                description: None,
            }
            .into_category(Utc::now())
        };
        let first = lighting();

        let mut scope = store.begin().await.unwrap();
        let categories = scope.repos().categories();
        categories.insert(&first).await.unwrap();
        let err = categories.insert(&lighting()).await.unwrap_err();
        assert!(matches!(err, CommerceError::DuplicateCategoryName(_)));

        assert!(categories.soft_delete(first.id, Utc::now()).await.unwrap());
        assert!(!categories.soft_delete(first.id, Utc::now()).await.unwrap());
        categories.insert(&lighting()).await.unwrap();
        scope.commit().await.unwrap();

        let live = store.reader().categories().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_ne!(live[0].id, first.id);
    }

    #[tokio::test]
    async fn test_cart_merge_keeps_insertion_order() {
        let store = MemoryStore::new();
        let user = UserId::generate();
        let (a, b) = (ProductId::generate(), ProductId::generate());
        let now = Utc::now();

        let mut scope = store.begin().await.unwrap();
        let carts = scope.repos().carts();
        let cart = carts.get_or_create(user, now).await.unwrap();
        assert_eq!(carts.get_or_create(user, now).await.unwrap().id, cart.id);

        carts.add_item(cart.id, a, 1, now).await.unwrap();
        carts.add_item(cart.id, b, 1, now).await.unwrap();
        let merged = carts.add_item(cart.id, a, 2, now).await.unwrap();
        assert_eq!(merged.quantity, 3);

        let cart = carts.find_by_user(user).await.unwrap().unwrap();
        let products: Vec<_> = cart.items.iter().map(|i| i.product_id).collect();
        assert_eq!(products, vec![a, b]);
    }

    #[tokio::test]
    async fn test_increment_usage_respects_limit() {
        use crate::coupon::{DiscountValue, NewCoupon};

        let store = MemoryStore::new();
        let coupon = NewCoupon {
            code: "ONCE".into(),
            discount: DiscountValue::Percentage(10.0),
            expires_at: Utc::now() + chrono::Duration::days(1),
            usage_limit: 1,
            is_active: true,
        }
        .into_coupon(Utc::now());
        let id = coupon.id;
        store.seed_coupon(coupon).await;

        let mut scope = store.begin().await.unwrap();
        assert!(scope.repos().coupons().increment_usage(id, Utc::now()).await.unwrap());
        assert!(!scope.repos().coupons().increment_usage(id, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_seed_waits_for_open_scope() {
        let store = Arc::new(MemoryStore::new());
        let scope = store.begin().await.unwrap();

        let p = product("SEED");
        let id = p.id;
        let seeding = {
            let store = store.clone();
            tokio::spawn(async move { store.seed_product(p).await })
        };
        tokio::task::yield_now().await;
        assert!(!seeding.is_finished());

        scope.commit().await.unwrap();
        seeding.await.unwrap();
        assert!(store.reader().product(id).await.unwrap().is_some());
    }
}
