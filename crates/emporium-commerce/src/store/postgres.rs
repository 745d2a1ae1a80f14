//! Postgres store.
//!
//! Each scope is one `sqlx` transaction. Rows that a scope reads in order to
//! decide a write (products during reservation, the cart during checkout and
//! edits, the order during a status change) are taken with
//! `SELECT ... FOR UPDATE`, so competing scopes serialize on that row and the
//! later one re-reads the committed state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::catalog::{Category, Product, ProductFilter};
use crate::coupon::{Coupon, DiscountValue};
use crate::ids::{CartId, CartItemId, CategoryId, CouponId, OrderId, ProductId, UserId};
use crate::money::{Currency, Money};
use crate::order::{Order, OrderItem, OrderStatus, StatusChange};
use crate::store::{
    CartRepository, CategoryRepository, CouponRepository, OrderRepository, ProductRepository,
    Reader, Repositories, Store, TransactionScope,
};
use crate::CommerceError;

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at, deleted_at";

const PRODUCT_COLUMNS: &str = "id, sku, name, description, category_id, price_cents, currency, \
     quantity, created_at, updated_at, deleted_at";

const COUPON_COLUMNS: &str = "id, code, discount_type, amount_cents, percent, currency, expires_at, \
     usage_limit, usage_count, is_active, created_at, updated_at, deleted_at";

const ORDER_COLUMNS: &str = "id, user_id, shipping_address_id, status, subtotal_cents, discount_cents, \
     total_cents, currency, coupon_code, tracking_number, payment_method, created_at, updated_at";

/// A [`Store`] backed by a Postgres pool.
pub struct PgStore {
    pool: PgPool,
    reader: PgReader,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            reader: PgReader { pool: pool.clone() },
            pool,
        }
    }

    pub fn from_db(db: &emporium_db::Db) -> Self {
        Self::new(db.pool().clone())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn TransactionScope>, CommerceError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgScope { tx }))
    }

    fn reader(&self) -> &dyn Reader {
        &self.reader
    }
}

struct PgScope {
    tx: Transaction<'static, Postgres>,
}

impl PgScope {
    fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl TransactionScope for PgScope {
    fn repos(&mut self) -> &mut dyn Repositories {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), CommerceError> {
        let PgScope { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CommerceError> {
        let PgScope { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

impl Repositories for PgScope {
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

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn parse_currency(code: &str) -> Result<Currency, CommerceError> {
    code.parse()
        .map_err(|_| CommerceError::storage(format_args!("unknown currency '{}' in row", code)))
}

fn category_from_row(row: &PgRow) -> Result<Category, CommerceError> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

async fn fetch_category(conn: &mut PgConnection, id: CategoryId) -> Result<Option<Category>, CommerceError> {
    let sql = format!(
        "SELECT {} FROM categories WHERE id = $1 AND deleted_at IS NULL",
        CATEGORY_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(category_from_row).transpose()
}

fn product_from_row(row: &PgRow) -> Result<Product, CommerceError> {
    let currency = parse_currency(row.try_get("currency")?)?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")?
            .map(CategoryId::from_uuid),
        price: Money::new(row.try_get("price_cents")?, currency),
        quantity: row.try_get("quantity")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn coupon_from_row(row: &PgRow) -> Result<Coupon, CommerceError> {
    let currency = parse_currency(row.try_get("currency")?)?;
    let kind: String = row.try_get("discount_type")?;
    let discount = match kind.as_str() {
        "fixed" => DiscountValue::Fixed(Money::new(
            row.try_get::<Option<i64>, _>("amount_cents")?.unwrap_or(0),
            currency,
        )),
        "percentage" => {
            DiscountValue::Percentage(row.try_get::<Option<f64>, _>("percent")?.unwrap_or(0.0))
        }
        other => {
            return Err(CommerceError::storage(format_args!(
                "unknown discount type '{}' in row",
                other
            )))
        }
    };
    Ok(Coupon {
        id: CouponId::from_uuid(row.try_get("id")?),
        code: row.try_get("code")?,
        discount,
        expires_at: row.try_get("expires_at")?,
        usage_limit: row.try_get("usage_limit")?,
        usage_count: row.try_get("usage_count")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn discount_columns(discount: &DiscountValue) -> (Option<i64>, Option<f64>) {
    match discount {
        DiscountValue::Fixed(amount) => (Some(amount.amount_cents), None),
        DiscountValue::Percentage(percent) => (None, Some(*percent)),
    }
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> Result<Order, CommerceError> {
    let currency = parse_currency(row.try_get("currency")?)?;
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        shipping_address_id: row.try_get::<Uuid, _>("shipping_address_id")?.into(),
        items,
        subtotal: Money::new(row.try_get("subtotal_cents")?, currency),
        discount: Money::new(row.try_get("discount_cents")?, currency),
        total: Money::new(row.try_get("total_cents")?, currency),
        coupon_code: row.try_get("coupon_code")?,
        status: status.parse()?,
        tracking_number: row.try_get("tracking_number")?,
        payment_method: row.try_get("payment_method")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn fetch_product(
    conn: &mut PgConnection,
    id: ProductId,
    lock: bool,
) -> Result<Option<Product>, CommerceError> {
    let sql = format!(
        "SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL{}",
        PRODUCT_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(product_from_row).transpose()
}

async fn fetch_cart_items(conn: &mut PgConnection, cart_id: CartId) -> Result<Vec<CartItem>, CommerceError> {
    let rows = sqlx::query(
        "SELECT id, cart_id, product_id, quantity, created_at FROM cart_items \
         WHERE cart_id = $1 ORDER BY seq",
    )
    .bind(cart_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(cart_item_from_row).collect()
}

fn cart_item_from_row(row: &PgRow) -> Result<CartItem, CommerceError> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get("id")?),
        cart_id: CartId::from_uuid(row.try_get("cart_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn fetch_cart(
    conn: &mut PgConnection,
    user_id: UserId,
    lock: bool,
) -> Result<Option<Cart>, CommerceError> {
    let sql = format!(
        "SELECT id, user_id, coupon_id, created_at, updated_at FROM carts WHERE user_id = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let id = CartId::from_uuid(row.try_get("id")?);
    let items = fetch_cart_items(conn, id).await?;
    Ok(Some(Cart {
        id,
        user_id,
        items,
        coupon_id: row.try_get::<Option<Uuid>, _>("coupon_id")?.map(CouponId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }))
}

async fn fetch_order_items(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<OrderItem>, CommerceError> {
    let rows = sqlx::query(
        "SELECT i.id, i.product_id, i.sku, i.name, i.quantity, i.price_cents, o.currency \
         FROM order_items i JOIN orders o ON o.id = i.order_id \
         WHERE i.order_id = $1 ORDER BY i.position",
    )
    .bind(order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<OrderItem, CommerceError> {
            let currency = parse_currency(row.try_get("currency")?)?;
            Ok(OrderItem {
                id: row.try_get::<Uuid, _>("id")?.into(),
                product_id: ProductId::from_uuid(row.try_get("product_id")?),
                sku: row.try_get("sku")?,
                name: row.try_get("name")?,
                quantity: row.try_get("quantity")?,
                price: Money::new(row.try_get("price_cents")?, currency),
            })
        })
        .collect()
}

async fn fetch_order(
    conn: &mut PgConnection,
    id: OrderId,
    lock: bool,
) -> Result<Option<Order>, CommerceError> {
    let sql = format!(
        "SELECT {} FROM orders WHERE id = $1{}",
        ORDER_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let items = fetch_order_items(conn, id).await?;
            order_from_row(&row, items).map(Some)
        }
        None => Ok(None),
    }
}

async fn hydrate_orders(conn: &mut PgConnection, rows: Vec<PgRow>) -> Result<Vec<Order>, CommerceError> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = OrderId::from_uuid(row.try_get("id")?);
        let items = fetch_order_items(conn, id).await?;
        orders.push(order_from_row(row, items)?);
    }
    Ok(orders)
}

#[async_trait]
impl CategoryRepository for PgScope {
    async fn insert(&mut self, category: &Category) -> Result<(), CommerceError> {
        let result = sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(self.conn())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(CommerceError::DuplicateCategoryName(category.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&mut self, id: CategoryId) -> Result<Option<Category>, CommerceError> {
        fetch_category(self.conn(), id).await
    }

    async fn update(&mut self, category: &Category) -> Result<(), CommerceError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, description = $3, updated_at = $4 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(self.conn())
        .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => Err(CommerceError::CategoryNotFound(category.id)),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(CommerceError::DuplicateCategoryName(category.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn soft_delete(&mut self, id: CategoryId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(self.conn())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductRepository for PgScope {
    async fn insert(&mut self, product: &Product) -> Result<(), CommerceError> {
        let result = sqlx::query(
            "INSERT INTO products \
             (id, sku, name, description, category_id, price_cents, currency, quantity, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id.map(Uuid::from))
        .bind(product.price.amount_cents)
        .bind(product.price.currency.code())
        .bind(product.quantity)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(self.conn())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(CommerceError::DuplicateSku(product.sku.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&mut self, id: ProductId) -> Result<Option<Product>, CommerceError> {
        fetch_product(self.conn(), id, false).await
    }

    async fn find_for_update(&mut self, id: ProductId) -> Result<Option<Product>, CommerceError> {
        fetch_product(self.conn(), id, true).await
    }

    async fn set_quantity(
        &mut self,
        id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        let result = sqlx::query(
            "UPDATE products SET quantity = $2, updated_at = $3 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .bind(now)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(CommerceError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn update(&mut self, product: &Product) -> Result<(), CommerceError> {
        let result = sqlx::query(
            "UPDATE products SET sku = $2, name = $3, description = $4, category_id = $5, \
             price_cents = $6, updated_at = $7 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id.map(Uuid::from))
        .bind(product.price.amount_cents)
        .bind(product.updated_at)
        .execute(self.conn())
        .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => Err(CommerceError::ProductNotFound(product.id)),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(CommerceError::DuplicateSku(product.sku.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn soft_delete(&mut self, id: ProductId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(self.conn())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartRepository for PgScope {
    async fn get_or_create(&mut self, user_id: UserId, now: DateTime<Utc>) -> Result<Cart, CommerceError> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, created_at, updated_at) VALUES ($1, $2, $3, $3) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(CartId::generate().as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(self.conn())
        .await?;

        fetch_cart(self.conn(), user_id, true)
            .await?
            .ok_or_else(|| CommerceError::storage(format_args!("cart for {} vanished", user_id)))
    }

    async fn find_by_user(&mut self, user_id: UserId) -> Result<Option<Cart>, CommerceError> {
        fetch_cart(self.conn(), user_id, false).await
    }

    async fn find_by_user_for_update(&mut self, user_id: UserId) -> Result<Option<Cart>, CommerceError> {
        fetch_cart(self.conn(), user_id, true).await
    }

    async fn add_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<CartItem, CommerceError> {
        let row = sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (cart_id, product_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             RETURNING id, cart_id, product_id, quantity, created_at",
        )
        .bind(CartItemId::generate().as_uuid())
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .bind(now)
        .fetch_one(self.conn())
        .await?;

        sqlx::query("UPDATE carts SET updated_at = $2 WHERE id = $1")
            .bind(cart_id.as_uuid())
            .bind(now)
            .execute(self.conn())
            .await?;

        cart_item_from_row(&row)
    }

    async fn find_item(&mut self, item_id: CartItemId) -> Result<Option<CartItem>, CommerceError> {
        let row = sqlx::query(
            "SELECT id, cart_id, product_id, quantity, created_at FROM cart_items WHERE id = $1",
        )
        .bind(item_id.as_uuid())
        .fetch_optional(self.conn())
        .await?;
        row.as_ref().map(cart_item_from_row).transpose()
    }

    async fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CommerceError> {
        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item_id.as_uuid())
            .bind(quantity)
            .execute(self.conn())
            .await?;
        Ok(())
    }

    async fn remove_item(&mut self, item_id: CartItemId) -> Result<(), CommerceError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    async fn clear(&mut self, cart_id: CartId) -> Result<(), CommerceError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    async fn set_coupon(
        &mut self,
        cart_id: CartId,
        coupon_id: Option<CouponId>,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        sqlx::query("UPDATE carts SET coupon_id = $2, updated_at = $3 WHERE id = $1")
            .bind(cart_id.as_uuid())
            .bind(coupon_id.map(Uuid::from))
            .bind(now)
            .execute(self.conn())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CouponRepository for PgScope {
    async fn insert(&mut self, coupon: &Coupon) -> Result<(), CommerceError> {
        let (amount_cents, percent) = discount_columns(&coupon.discount);
        let currency = match coupon.discount {
            DiscountValue::Fixed(amount) => amount.currency,
            DiscountValue::Percentage(_) => Currency::default(),
        };
        let result = sqlx::query(
            "INSERT INTO coupons (id, code, discount_type, amount_cents, percent, currency, \
             expires_at, usage_limit, usage_count, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(coupon.id.as_uuid())
        .bind(&coupon.code)
        .bind(coupon.discount.kind())
        .bind(amount_cents)
        .bind(percent)
        .bind(currency.code())
        .bind(coupon.expires_at)
        .bind(coupon.usage_limit)
        .bind(coupon.usage_count)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(self.conn())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(CommerceError::DuplicateCouponCode(coupon.code.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&mut self, id: CouponId) -> Result<Option<Coupon>, CommerceError> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE id = $1 AND deleted_at IS NULL",
            COUPON_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.conn())
            .await?;
        row.as_ref().map(coupon_from_row).transpose()
    }

    async fn find_by_code(&mut self, code: &str) -> Result<Option<Coupon>, CommerceError> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE code = $1 AND deleted_at IS NULL",
            COUPON_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(self.conn())
            .await?;
        row.as_ref().map(coupon_from_row).transpose()
    }

    async fn update(&mut self, coupon: &Coupon) -> Result<(), CommerceError> {
        let (amount_cents, percent) = discount_columns(&coupon.discount);
        let result = sqlx::query(
            "UPDATE coupons SET discount_type = $2, amount_cents = $3, percent = $4, \
             expires_at = $5, usage_limit = $6, is_active = $7, updated_at = $8 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(coupon.id.as_uuid())
        .bind(coupon.discount.kind())
        .bind(amount_cents)
        .bind(percent)
        .bind(coupon.expires_at)
        .bind(coupon.usage_limit)
        .bind(coupon.is_active)
        .bind(coupon.updated_at)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(CommerceError::coupon_not_found(&coupon.id));
        }
        Ok(())
    }

    async fn increment_usage(&mut self, id: CouponId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        let result = sqlx::query(
            "UPDATE coupons SET usage_count = usage_count + 1, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL AND usage_count < usage_limit",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(self.conn())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&mut self, id: CouponId, now: DateTime<Utc>) -> Result<bool, CommerceError> {
        let result = sqlx::query(
            "UPDATE coupons SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(self.conn())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PgScope {
    async fn insert(&mut self, order: &Order) -> Result<(), CommerceError> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, shipping_address_id, status, subtotal_cents, \
             discount_cents, total_cents, currency, coupon_code, tracking_number, payment_method, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.shipping_address_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.subtotal.amount_cents)
        .bind(order.discount.amount_cents)
        .bind(order.total.amount_cents)
        .bind(order.total.currency.code())
        .bind(&order.coupon_code)
        .bind(&order.tracking_number)
        .bind(&order.payment_method)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(self.conn())
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items \
                 (id, order_id, position, product_id, sku, name, quantity, price_cents) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.sku)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.price.amount_cents)
            .execute(self.conn())
            .await?;
        }
        Ok(())
    }

    async fn find_by_id(&mut self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        fetch_order(self.conn(), id, false).await
    }

    async fn find_for_update(&mut self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        fetch_order(self.conn(), id, true).await
    }

    async fn update_status(&mut self, id: OrderId, change: &StatusChange) -> Result<(), CommerceError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, \
             tracking_number = COALESCE($3, tracking_number), \
             payment_method = COALESCE($4, payment_method), \
             updated_at = $5 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(change.status.as_str())
        .bind(&change.tracking_number)
        .bind(&change.payment_method)
        .bind(change.updated_at)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(CommerceError::OrderNotFound(id));
        }
        Ok(())
    }
}

struct PgReader {
    pool: PgPool,
}

#[async_trait]
impl Reader for PgReader {
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        fetch_category(&mut conn, id).await
    }

    async fn categories(&self) -> Result<Vec<Category>, CommerceError> {
        let sql = format!(
            "SELECT {} FROM categories WHERE deleted_at IS NULL ORDER BY name",
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id, false).await
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CommerceError> {
        let sql = format!(
            "SELECT {} FROM products WHERE deleted_at IS NULL \
             AND ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR sku ILIKE '%' || $1 || '%') \
             AND ($2::UUID IS NULL OR category_id = $2) \
             AND ($3::BIGINT IS NULL OR price_cents >= $3) \
             AND ($4::BIGINT IS NULL OR price_cents <= $4) \
             AND (NOT $5 OR quantity > 0) \
             ORDER BY name, sku LIMIT $6 OFFSET $7",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.search)
            .bind(filter.category_id.map(Uuid::from))
            .bind(filter.min_price.map(|m| m.amount_cents))
            .bind(filter.max_price.map(|m| m.amount_cents))
            .bind(filter.in_stock_only)
            .bind(filter.limit.map(|l| l.min(i64::MAX as usize) as i64))
            .bind(filter.offset.min(i64::MAX as usize) as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn coupon(&self, id: CouponId) -> Result<Option<Coupon>, CommerceError> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE id = $1 AND deleted_at IS NULL",
            COUPON_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(coupon_from_row).transpose()
    }

    async fn coupons(&self) -> Result<Vec<Coupon>, CommerceError> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE deleted_at IS NULL ORDER BY code",
            COUPON_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(coupon_from_row).collect()
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id, false).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&mut *conn)
            .await?;
        hydrate_orders(&mut conn, rows).await
    }

    async fn orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, CommerceError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {} FROM orders WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&mut *conn)
            .await?;
        hydrate_orders(&mut conn, rows).await
    }
}
