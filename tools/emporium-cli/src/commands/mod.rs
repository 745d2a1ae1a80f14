//! CLI command implementations.

pub mod cart;
pub mod category;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod init;
pub mod migrate;
pub mod order;
pub mod product;

use std::str::FromStr;

use anyhow::Context as _;
use clap::{Args, Subcommand};
use emporium_commerce::{CommerceError, ErrorKind};

/// Parse a UUID argument, naming it in the error.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid {} ID: '{}'", what, raw))
}

/// Process exit code for a failed command.
///
/// Business rule violations exit with 2, everything else with 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CommerceError>().map(CommerceError::kind) {
        Some(ErrorKind::Internal) | None => 1,
        Some(_) => 2,
    }
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Database URL to write into the file.
    #[arg(long)]
    pub database_url: Option<String>,

    /// Path of the file to create.
    #[arg(short, long, default_value = "emporium.toml")]
    pub path: String,

    /// Overwrite an existing file.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the migrate command.
#[derive(Args)]
pub struct MigrateArgs {
    /// Print the statements instead of running them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Validate the configuration.
    Validate,
}

/// Arguments for the category command.
#[derive(Args)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// Create a category.
    Add {
        /// Display name, unique among categories.
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List categories.
    List,
    /// Edit a category. An empty description clears it.
    Update {
        /// Category ID.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Soft-delete a category.
    Delete {
        /// Category ID.
        id: String,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the product command.
#[derive(Args)]
pub struct ProductArgs {
    #[command(subcommand)]
    pub command: ProductCommand,
}

#[derive(Subcommand)]
pub enum ProductCommand {
    /// Create a product.
    Add {
        /// Stock keeping unit.
        #[arg(long)]
        sku: String,
        /// Display name.
        #[arg(long)]
        name: String,
        /// Unit price, e.g. 19.99.
        #[arg(long)]
        price: String,
        /// Units in stock.
        #[arg(long, default_value = "0")]
        quantity: i64,
        /// Description.
        #[arg(long)]
        description: Option<String>,
        /// Category ID.
        #[arg(long)]
        category: Option<String>,
    },
    /// List products.
    List {
        /// Match name or SKU.
        #[arg(short, long)]
        search: Option<String>,
        /// Only products in this category.
        #[arg(long)]
        category: Option<String>,
        /// Lowest price, e.g. 5.00.
        #[arg(long)]
        min_price: Option<String>,
        /// Highest price.
        #[arg(long)]
        max_price: Option<String>,
        /// Only products with stock.
        #[arg(long)]
        in_stock: bool,
        /// Maximum rows.
        #[arg(short, long)]
        limit: Option<usize>,
        /// Rows to skip.
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Edit a product.
    Update {
        /// Product ID.
        id: String,
        #[arg(long)]
        sku: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Move the product to this category.
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<String>,
    },
    /// Add units to a product's stock.
    Restock {
        /// Product ID.
        id: String,
        /// Units to add.
        quantity: i64,
    },
    /// Soft-delete a product.
    Delete {
        /// Product ID.
        id: String,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the coupon command.
#[derive(Args)]
pub struct CouponArgs {
    #[command(subcommand)]
    pub command: CouponCommand,
}

#[derive(Subcommand)]
pub enum CouponCommand {
    /// Create a coupon.
    Add {
        /// Coupon code (letters and digits).
        code: String,
        /// Fixed amount off, e.g. 5.00.
        #[arg(long, conflicts_with = "percent", required_unless_present = "percent")]
        fixed: Option<String>,
        /// Percentage off, 0-100.
        #[arg(long)]
        percent: Option<f64>,
        /// Days until the coupon expires.
        #[arg(long, default_value = "30", conflicts_with = "expires")]
        days: i64,
        /// Expiry as an RFC 3339 timestamp.
        #[arg(long)]
        expires: Option<String>,
        /// Maximum number of uses.
        #[arg(long, default_value = "100")]
        limit: i64,
    },
    /// List coupons.
    List,
    /// Deactivate a coupon.
    Disable {
        /// Coupon ID.
        id: String,
    },
    /// Soft-delete a coupon.
    Delete {
        /// Coupon ID.
        id: String,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart.
    Show,
    /// Add units of a product.
    Add {
        /// Product ID.
        product: String,
        /// Units to add.
        #[arg(default_value = "1")]
        quantity: i64,
    },
    /// Set a line's quantity (0 removes it).
    Set {
        /// Cart item ID.
        item: String,
        /// New quantity.
        quantity: i64,
    },
    /// Remove a line.
    Remove {
        /// Cart item ID.
        item: String,
    },
    /// Attach a coupon by code.
    ApplyCoupon {
        /// Coupon code.
        code: String,
    },
    /// Detach the coupon.
    RemoveCoupon,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Shipping address ID.
    #[arg(long)]
    pub address: String,
}

/// Arguments for the order command.
#[derive(Args)]
pub struct OrderArgs {
    #[command(subcommand)]
    pub command: OrderCommand,
}

#[derive(Subcommand)]
pub enum OrderCommand {
    /// List orders.
    List {
        /// Every user's orders (staff).
        #[arg(short, long)]
        all: bool,
        /// Only orders in this status (with --all).
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show one order.
    Show {
        /// Order ID.
        id: String,
    },
    /// Confirm payment (pending -> processing).
    Pay {
        /// Order ID.
        id: String,
        /// Payment method.
        #[arg(short, long)]
        method: Option<String>,
    },
    /// Ship an order (processing -> shipped).
    Ship {
        /// Order ID.
        id: String,
        /// Carrier tracking number.
        #[arg(short, long)]
        tracking: String,
    },
    /// Complete an order (shipped -> completed).
    Complete {
        /// Order ID.
        id: String,
    },
    /// Cancel an order and restock its items.
    Cancel {
        /// Order ID.
        id: String,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Apply a payment provider notification.
    Webhook {
        /// JSON payload file; `-` reads stdin.
        #[arg(short, long, conflicts_with = "payload", required_unless_present = "payload")]
        file: Option<String>,
        /// Inline JSON payload.
        #[arg(long)]
        payload: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_commerce::OrderId;

    #[test]
    fn test_exit_codes() {
        let rule = anyhow::Error::new(CommerceError::OrderNotFound(OrderId::generate()));
        assert_eq!(exit_code(&rule), 2);

        let internal = anyhow::Error::new(CommerceError::PersistenceFailure("gone".into()));
        assert_eq!(exit_code(&internal), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("io")), 1);
    }
}
