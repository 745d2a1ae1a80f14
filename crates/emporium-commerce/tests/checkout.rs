mod common;

use std::sync::Arc;

use common::{usd, Harness};
use emporium_commerce::prelude::*;

#[tokio::test]
async fn test_checkout_places_pending_order_and_empties_cart() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let bulb = h.product("BULB-01", 500, 5).await;
    h.coupon("SAVE5", DiscountValue::Fixed(usd(500)), 10).await;
    let shopper = h.shopper();

    h.commerce.carts.add_item(&shopper, lamp.id, 2).await.unwrap();
    h.commerce.carts.add_item(&shopper, bulb.id, 1).await.unwrap();
    let view = h.commerce.carts.apply_coupon(&shopper, "SAVE5").await.unwrap();
    assert_eq!(view.pricing.subtotal, usd(2500));
    assert_eq!(view.pricing.discount, usd(500));
    assert_eq!(view.pricing.grand_total, usd(2000));

    let address = AddressId::generate();
    let order = h.commerce.checkout.checkout(&shopper, address).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, usd(2500));
    assert_eq!(order.discount, usd(500));
    assert_eq!(order.total, usd(2000));
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE5"));
    assert_eq!(order.shipping_address_id, address);
    let skus: Vec<_> = order.items.iter().map(|i| i.sku.as_str()).collect();
    assert_eq!(skus, vec!["LAMP-01", "BULB-01"]);

    assert_eq!(h.stock(lamp.id).await, 3);
    assert_eq!(h.stock(bulb.id).await, 4);

    let cart = h.commerce.carts.cart(&shopper).await.unwrap();
    assert!(cart.cart.is_empty());
    assert!(cart.cart.coupon_id.is_none());
    assert_eq!(cart.cart.id, view.cart.id);
}

#[tokio::test]
async fn test_empty_cart_writes_nothing() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let shopper = h.shopper();

    // Never touched a cart.
    let err = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::CartIsEmpty));

    // Cart exists but is empty.
    h.commerce.carts.cart(&shopper).await.unwrap();
    let err = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::CartIsEmpty));

    assert_eq!(h.store.order_count(), 0);
    assert_eq!(h.stock(lamp.id).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_for_last_unit() {
    let h = Arc::new(Harness::new());
    let lamp = h.product("LAMP-01", 1000, 1).await;

    let alice = h.shopper();
    let bob = h.shopper();
    h.commerce.carts.add_item(&alice, lamp.id, 1).await.unwrap();
    h.commerce.carts.add_item(&bob, lamp.id, 1).await.unwrap();

    let tasks: Vec<_> = [alice, bob]
        .into_iter()
        .map(|actor| {
            let h = h.clone();
            tokio::spawn(async move {
                h.commerce
                    .checkout
                    .checkout(&actor, AddressId::generate())
                    .await
            })
        })
        .collect();

    let mut placed = 0;
    let mut out_of_stock = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CommerceError::OutOfStock {
                available: 0,
                requested: 1,
                ..
            }) => out_of_stock += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(h.stock(lamp.id).await, 0);
    assert_eq!(h.store.order_count(), 1);
}

#[tokio::test]
async fn test_failed_order_insert_rolls_back_stock() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let bulb = h.product("BULB-01", 500, 2).await;
    let shopper = h.shopper();
    h.commerce.carts.add_item(&shopper, lamp.id, 3).await.unwrap();
    h.commerce.carts.add_item(&shopper, bulb.id, 2).await.unwrap();

    h.store.fail_order_inserts(true);
    let err = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::PersistenceFailure(_)));

    assert_eq!(h.stock(lamp.id).await, 5);
    assert_eq!(h.stock(bulb.id).await, 2);
    assert_eq!(h.store.order_count(), 0);
    let cart = h.commerce.carts.cart(&shopper).await.unwrap();
    assert_eq!(cart.cart.items.len(), 2);

    h.store.fail_order_inserts(false);
    h.commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap();
    assert_eq!(h.stock(lamp.id).await, 2);
}

#[tokio::test]
async fn test_out_of_stock_on_later_line_undoes_earlier_reservations() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let bulb = h.product("BULB-01", 500, 3).await;
    let shopper = h.shopper();
    h.commerce.carts.add_item(&shopper, lamp.id, 2).await.unwrap();
    h.commerce.carts.add_item(&shopper, bulb.id, 3).await.unwrap();

    // Someone else buys a bulb first.
    let other = h.shopper();
    h.commerce.carts.add_item(&other, bulb.id, 1).await.unwrap();
    h.commerce
        .checkout
        .checkout(&other, AddressId::generate())
        .await
        .unwrap();

    let err = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommerceError::OutOfStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
    assert_eq!(h.stock(lamp.id).await, 5);
}

#[tokio::test]
async fn test_order_keeps_price_at_purchase() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let shopper = h.shopper();
    h.commerce.carts.add_item(&shopper, lamp.id, 1).await.unwrap();
    let order = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap();

    h.commerce
        .catalog
        .update_product(
            &h.staff,
            lamp.id,
            ProductPatch {
                price: Some(usd(9900)),
                name: Some("Premium Lamp".into()),
                ..ProductPatch::default()
            },
        )
        .await
        .unwrap();

    let reloaded = h.commerce.orders.order(&shopper, order.id).await.unwrap();
    assert_eq!(reloaded.items[0].price, usd(1000));
    assert_eq!(reloaded.items[0].name, "Product LAMP-01");
    assert_eq!(reloaded.total, usd(1000));
}

#[tokio::test]
async fn test_coupon_revalidated_at_checkout() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let coupon = h.coupon("SPRING", DiscountValue::Percentage(10.0), 5).await;
    let shopper = h.shopper();
    h.commerce.carts.add_item(&shopper, lamp.id, 1).await.unwrap();
    h.commerce.carts.apply_coupon(&shopper, "SPRING").await.unwrap();

    h.commerce
        .coupons
        .update_coupon(&h.staff, coupon.id, CouponPatch::active(false))
        .await
        .unwrap();

    let err = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::CouponExpired(_)));
    assert_eq!(h.stock(lamp.id).await, 5);
}

#[tokio::test]
async fn test_coupon_usage_not_counted_by_default() {
    let h = Harness::new();
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let coupon = h.coupon("ONCE", DiscountValue::Fixed(usd(100)), 1).await;

    for _ in 0..2 {
        let shopper = h.shopper();
        h.commerce.carts.add_item(&shopper, lamp.id, 1).await.unwrap();
        h.commerce.carts.apply_coupon(&shopper, "ONCE").await.unwrap();
        h.commerce
            .checkout
            .checkout(&shopper, AddressId::generate())
            .await
            .unwrap();
    }

    let stored = h.commerce.coupons.coupon(&h.staff, coupon.id).await.unwrap();
    assert_eq!(stored.usage_count, 0);
}

#[tokio::test]
async fn test_coupon_usage_counted_when_enabled() {
    let config = CommerceConfig {
        checkout: CheckoutPolicy {
            count_coupon_usage: true,
        },
        ..CommerceConfig::default()
    };
    let h = Harness::with_config(config);
    let lamp = h.product("LAMP-01", 1000, 5).await;
    let coupon = h.coupon("ONCE", DiscountValue::Fixed(usd(100)), 1).await;

    let first = h.shopper();
    let second = h.shopper();
    for shopper in [&first, &second] {
        h.commerce.carts.add_item(shopper, lamp.id, 1).await.unwrap();
        h.commerce.carts.apply_coupon(shopper, "ONCE").await.unwrap();
    }

    h.commerce
        .checkout
        .checkout(&first, AddressId::generate())
        .await
        .unwrap();
    let err = h
        .commerce
        .checkout
        .checkout(&second, AddressId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::CouponUsageLimitReached(_)));

    let stored = h.commerce.coupons.coupon(&h.staff, coupon.id).await.unwrap();
    assert_eq!(stored.usage_count, 1);
    assert_eq!(h.stock(lamp.id).await, 4);
}

#[tokio::test]
async fn test_discount_larger_than_subtotal_gives_zero_total() {
    let h = Harness::new();
    let pen = h.product("PEN-01", 300, 5).await;
    h.coupon("BIGONE", DiscountValue::Fixed(usd(1000)), 5).await;
    let shopper = h.shopper();
    h.commerce.carts.add_item(&shopper, pen.id, 1).await.unwrap();
    h.commerce.carts.apply_coupon(&shopper, "BIGONE").await.unwrap();

    let order = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap();
    assert_eq!(order.discount, usd(1000));
    assert_eq!(order.total, usd(0));
}
