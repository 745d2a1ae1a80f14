//! Transactional order-fulfillment core for the Emporium store.
//!
//! - **Catalog**: products and the stock ledger
//! - **Coupons**: coupons and the coupon validator
//! - **Cart**: one cart per user, priced with an optional coupon
//! - **Orders**: frozen order snapshots and the status state machine
//! - **Store**: repository traits, the unit of work, in-memory and Postgres
//!   backends
//! - **Services**: checkout, order lifecycle, cart, coupon and catalog
//!   administration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use emporium_commerce::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let commerce = Commerce::new(store, Arc::new(SystemClock), CommerceConfig::default());
//!
//! let staff = Actor::staff(UserId::generate());
//! let lamp = commerce
//!     .catalog
//!     .create_product(&staff, NewProduct {
//!         sku: "LAMP-01".into(),
//!         name: "Desk Lamp".into(),
//!         description: None,
//!         category_id: None,
//!         price: Money::new(2500, Currency::USD),
//!         quantity: 10,
//!     })
//!     .await?;
//!
//! let shopper = Actor::customer(UserId::generate());
//! commerce.carts.add_item(&shopper, lamp.id, 2).await?;
//! let order = commerce.checkout.checkout(&shopper, AddressId::generate()).await?;
//! println!("Total: {}", order.total);
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod order;
pub mod service;
pub mod store;

pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::auth::{Actor, Role};
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{CheckoutPolicy, CommerceConfig};
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    pub use crate::cart::{Cart, CartItem, CartLine, CartPricing, CartView};
    pub use crate::catalog::{
        Category, CategoryPatch, NewCategory, NewProduct, Product, ProductFilter, ProductPatch,
        StockLedger,
    };
    pub use crate::coupon::{Coupon, CouponPatch, CouponValidator, DiscountValue, NewCoupon};
    pub use crate::order::{Order, OrderItem, OrderStatus, PaymentWebhook};

    pub use crate::service::{
        CartService, CatalogService, CheckoutService, Commerce, CouponService, OrderService,
    };
    pub use crate::store::{MemoryStore, Reader, Repositories, Store, UnitOfWork};
    #[cfg(feature = "postgres")]
    pub use crate::store::PgStore;
}
