//! Application services.
//!
//! Each mutating call is exactly one unit of work. Reporting calls go
//! through the store's [`Reader`](crate::store::Reader) and skip the
//! transaction entirely.

mod cart;
mod catalog;
mod checkout;
mod coupons;
mod orders;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use coupons::CouponService;
pub use orders::OrderService;

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::CommerceConfig;
use crate::store::{Store, UnitOfWork};

/// What every service needs.
#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) uow: UnitOfWork,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Arc<CommerceConfig>,
}

/// All services wired to one store.
#[derive(Clone)]
pub struct Commerce {
    pub catalog: CatalogService,
    pub coupons: CouponService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
}

impl Commerce {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: CommerceConfig) -> Self {
        let ctx = ServiceContext {
            uow: UnitOfWork::new(store),
            clock,
            config: Arc::new(config),
        };
        Self {
            catalog: CatalogService::new(ctx.clone()),
            coupons: CouponService::new(ctx.clone()),
            carts: CartService::new(ctx.clone()),
            checkout: CheckoutService::new(ctx.clone()),
            orders: OrderService::new(ctx),
        }
    }
}
