//! Emporium CLI - operate the store backend from a terminal.
//!
//! Commands:
//! - `emporium init` - Write a starter `emporium.toml`
//! - `emporium migrate` - Create the database schema
//! - `emporium config` - Show or validate configuration
//! - `emporium category` - Product category administration
//! - `emporium product` - Catalog administration
//! - `emporium coupon` - Coupon administration
//! - `emporium cart` - Inspect and edit a user's cart
//! - `emporium checkout` - Turn a user's cart into an order
//! - `emporium order` - Order reads and lifecycle transitions

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use emporium_observability::{operation_span, RequestId};
use tracing::Instrument;

use commands::{
    CartArgs, CategoryArgs, CheckoutArgs, ConfigArgs, CouponArgs, InitArgs, MigrateArgs, OrderArgs,
    ProductArgs,
};

/// Emporium CLI - manage the catalog, carts and orders
#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Act as this user (UUID)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Role of the acting user (customer, staff, admin)
    #[arg(short, long, global = true, default_value = "staff")]
    role: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init(InitArgs),

    /// Create the database schema
    Migrate(MigrateArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Manage product categories
    Category(CategoryArgs),

    /// Manage products
    Product(ProductArgs),

    /// Manage coupons
    Coupon(CouponArgs),

    /// Inspect and edit the acting user's cart
    Cart(CartArgs),

    /// Place an order from the acting user's cart
    Checkout(CheckoutArgs),

    /// Read and transition orders
    Order(OrderArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Migrate(_) => "migrate",
            Self::Config(_) => "config",
            Self::Category(_) => "category",
            Self::Product(_) => "product",
            Self::Coupon(_) => "coupon",
            Self::Cart(_) => "cart",
            Self::Checkout(_) => "checkout",
            Self::Order(_) => "order",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config and resolve the acting user
    let ctx = match context::Context::load(
        cli.config.as_deref(),
        cli.user.as_deref(),
        &cli.role,
        output.clone(),
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let mut logging = ctx.config.logging.clone();
    if cli.verbose {
        logging.level = emporium_observability::LogLevel::Debug;
    }
    if let Err(e) = emporium_observability::init(&logging) {
        ctx.output.warn(&format!("{}", e));
    }

    let span = operation_span(cli.command.name(), &RequestId::generate());
    let result = async {
        match cli.command {
            Commands::Init(args) => commands::init::run(args, &ctx).await,
            Commands::Migrate(args) => commands::migrate::run(args, &ctx).await,
            Commands::Config(args) => commands::config::run(args, &ctx).await,
            Commands::Category(args) => commands::category::run(args, &ctx).await,
            Commands::Product(args) => commands::product::run(args, &ctx).await,
            Commands::Coupon(args) => commands::coupon::run(args, &ctx).await,
            Commands::Cart(args) => commands::cart::run(args, &ctx).await,
            Commands::Checkout(args) => commands::checkout::run(args, &ctx).await,
            Commands::Order(args) => commands::order::run(args, &ctx).await,
        }
    }
    .instrument(span)
    .await;

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(commands::exit_code(&e));
    }

    Ok(())
}
