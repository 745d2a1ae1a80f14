#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use emporium_commerce::prelude::*;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub commerce: Commerce,
    pub staff: Actor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CommerceConfig::default())
    }

    pub fn with_config(config: CommerceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let commerce = Commerce::new(store.clone(), clock.clone(), config);
        Self {
            store,
            clock,
            commerce,
            staff: Actor::staff(UserId::generate()),
        }
    }

    pub async fn product(&self, sku: &str, cents: i64, quantity: i64) -> Product {
        self.commerce
            .catalog
            .create_product(
                &self.staff,
                NewProduct {
                    sku: sku.to_string(),
                    name: format!("Product {}", sku),
                    description: None,
                    category_id: None,
                    price: Money::new(cents, Currency::USD),
                    quantity,
                },
            )
            .await
            .unwrap()
    }

    pub async fn coupon(&self, code: &str, discount: DiscountValue, usage_limit: i64) -> Coupon {
        self.commerce
            .coupons
            .create_coupon(
                &self.staff,
                NewCoupon {
                    code: code.to_string(),
                    discount,
                    expires_at: self.clock.now() + Duration::days(7),
                    usage_limit,
                    is_active: true,
                },
            )
            .await
            .unwrap()
    }

    pub async fn stock(&self, id: ProductId) -> i64 {
        self.commerce.catalog.product(id).await.unwrap().quantity
    }

    pub fn shopper(&self) -> Actor {
        Actor::customer(UserId::generate())
    }
}

pub fn usd(cents: i64) -> Money {
    Money::new(cents, Currency::USD)
}
