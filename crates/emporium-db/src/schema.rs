//! Table definitions.
//!
//! One statement per constant; [`STATEMENTS`] lists them in dependency order
//! and every statement is idempotent so `migrate` can run on each start.

/// Flat product categories.
pub const CREATE_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id UUID PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ
)
"#;

/// Category names are unique among live categories only.
pub const CREATE_CATEGORIES_NAME_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_live_name
    ON categories (name) WHERE deleted_at IS NULL
"#;

/// Products and their sellable stock counter.
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id UUID PRIMARY KEY,
    sku TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    category_id UUID REFERENCES categories (id),
    price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
    currency TEXT NOT NULL,
    quantity BIGINT NOT NULL CHECK (quantity >= 0),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ
)
"#;

/// Adds the category column to products tables created before categories.
pub const ADD_PRODUCTS_CATEGORY_COLUMN: &str = r#"
ALTER TABLE products ADD COLUMN IF NOT EXISTS category_id UUID REFERENCES categories (id)
"#;

/// SKUs are unique among live products only.
pub const CREATE_PRODUCTS_SKU_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_products_live_sku
    ON products (sku) WHERE deleted_at IS NULL
"#;

/// Discount coupons.
pub const CREATE_COUPONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS coupons (
    id UUID PRIMARY KEY,
    code TEXT NOT NULL,
    discount_type TEXT NOT NULL CHECK (discount_type IN ('fixed', 'percentage')),
    amount_cents BIGINT,
    percent DOUBLE PRECISION,
    currency TEXT NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    usage_limit BIGINT NOT NULL CHECK (usage_limit >= 1),
    usage_count BIGINT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ,
    CHECK (usage_count >= 0 AND usage_count <= usage_limit)
)
"#;

/// Coupon codes are unique among live coupons only.
pub const CREATE_COUPONS_CODE_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_coupons_live_code
    ON coupons (code) WHERE deleted_at IS NULL
"#;

/// One cart per user.
pub const CREATE_CARTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS carts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL UNIQUE,
    coupon_id UUID REFERENCES coupons (id),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

/// Cart lines; `seq` keeps insertion order.
pub const CREATE_CART_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cart_items (
    id UUID PRIMARY KEY,
    seq BIGSERIAL,
    cart_id UUID NOT NULL REFERENCES carts (id),
    product_id UUID NOT NULL REFERENCES products (id),
    quantity BIGINT NOT NULL CHECK (quantity >= 1),
    created_at TIMESTAMPTZ NOT NULL,
    UNIQUE (cart_id, product_id)
)
"#;

/// Orders.
pub const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    shipping_address_id UUID NOT NULL,
    status TEXT NOT NULL,
    subtotal_cents BIGINT NOT NULL,
    discount_cents BIGINT NOT NULL DEFAULT 0,
    total_cents BIGINT NOT NULL CHECK (total_cents >= 0),
    currency TEXT NOT NULL,
    coupon_code TEXT,
    tracking_number TEXT,
    payment_method TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

/// Listing a user's orders is the hot read path.
pub const CREATE_ORDERS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_orders_user ON orders (user_id, created_at DESC)
"#;

/// Order lines, frozen at checkout.
pub const CREATE_ORDER_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_items (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES orders (id),
    position INTEGER NOT NULL,
    product_id UUID NOT NULL,
    sku TEXT NOT NULL,
    name TEXT NOT NULL,
    quantity BIGINT NOT NULL CHECK (quantity >= 1),
    price_cents BIGINT NOT NULL,
    UNIQUE (order_id, position)
)
"#;

/// Every schema statement, in the order they must run.
pub const STATEMENTS: &[&str] = &[
    CREATE_CATEGORIES_TABLE,
    CREATE_CATEGORIES_NAME_INDEX,
    CREATE_PRODUCTS_TABLE,
    ADD_PRODUCTS_CATEGORY_COLUMN,
    CREATE_PRODUCTS_SKU_INDEX,
    CREATE_COUPONS_TABLE,
    CREATE_COUPONS_CODE_INDEX,
    CREATE_CARTS_TABLE,
    CREATE_CART_ITEMS_TABLE,
    CREATE_ORDERS_TABLE,
    CREATE_ORDERS_USER_INDEX,
    CREATE_ORDER_ITEMS_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_are_idempotent() {
        for statement in STATEMENTS {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "statement is not idempotent: {}",
                statement
            );
        }
    }

    #[test]
    fn test_referenced_tables_created_first() {
        let position = |needle: &str| {
            STATEMENTS
                .iter()
                .position(|s| s.contains(needle))
                .unwrap()
        };
        assert!(position("TABLE IF NOT EXISTS categories") < position("TABLE IF NOT EXISTS products"));
        assert!(position("TABLE IF NOT EXISTS coupons") < position("TABLE IF NOT EXISTS carts"));
        assert!(position("TABLE IF NOT EXISTS carts") < position("TABLE IF NOT EXISTS cart_items"));
        assert!(position("TABLE IF NOT EXISTS orders") < position("TABLE IF NOT EXISTS order_items"));
    }
}
