mod common;

use common::Harness;
use emporium_commerce::prelude::*;

async fn placed_order(h: &Harness, shopper: &Actor) -> (Order, ProductId) {
    let lamp = h.product("LAMP-01", 1000, 5).await;
    h.commerce.carts.add_item(shopper, lamp.id, 2).await.unwrap();
    let order = h
        .commerce
        .checkout
        .checkout(shopper, AddressId::generate())
        .await
        .unwrap();
    (order, lamp.id)
}

#[tokio::test]
async fn test_full_lifecycle() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;

    let order = h
        .commerce
        .orders
        .confirm_payment(&h.staff, order.id, Some("card".into()))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_method.as_deref(), Some("card"));

    let order = h.commerce.orders.ship(&h.staff, order.id, "1Z999AA10123456784").await.unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);

    let order = h.commerce.orders.complete(&h.staff, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    let stored = h.commerce.orders.order(&shopper, order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.tracking_number.as_deref(), Some("1Z999AA10123456784"));
    assert_eq!(stored.payment_method.as_deref(), Some("card"));
}

#[tokio::test]
async fn test_pending_cannot_ship() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;

    let err = h.commerce.orders.ship(&h.staff, order.id, "TRACK1").await.unwrap_err();
    assert!(matches!(
        err,
        CommerceError::InvalidOrderStatusTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped
        }
    ));
    let stored = h.commerce.orders.order(&shopper, order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(stored.tracking_number.is_none());
}

#[tokio::test]
async fn test_complete_requires_shipped() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;
    h.commerce
        .orders
        .confirm_payment(&h.staff, order.id, None)
        .await
        .unwrap();

    let err = h.commerce.orders.complete(&h.staff, order.id).await.unwrap_err();
    assert!(matches!(err, CommerceError::InvalidOrderStatusTransition { .. }));
}

#[tokio::test]
async fn test_ship_requires_tracking_number() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;
    h.commerce
        .orders
        .confirm_payment(&h.staff, order.id, None)
        .await
        .unwrap();

    let err = h.commerce.orders.ship(&h.staff, order.id, "   ").await.unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));
}

#[tokio::test]
async fn test_staff_only_transitions() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;

    let err = h
        .commerce
        .orders
        .confirm_payment(&shopper, order.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Forbidden(_)));
    assert_eq!(err.kind().http_status(), 403);
}

#[tokio::test]
async fn test_owner_cancel_restocks() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, lamp) = placed_order(&h, &shopper).await;
    assert_eq!(h.stock(lamp).await, 3);

    let order = h.commerce.orders.cancel(&shopper, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(h.stock(lamp).await, 5);

    let err = h.commerce.orders.cancel(&shopper, order.id).await.unwrap_err();
    assert!(matches!(err, CommerceError::InvalidOrderStatusTransition { .. }));
    assert_eq!(h.stock(lamp).await, 5);
}

#[tokio::test]
async fn test_cannot_cancel_shipped() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, lamp) = placed_order(&h, &shopper).await;
    h.commerce.orders.confirm_payment(&h.staff, order.id, None).await.unwrap();
    h.commerce.orders.ship(&h.staff, order.id, "TRACK1").await.unwrap();

    let err = h.commerce.orders.cancel(&h.staff, order.id).await.unwrap_err();
    assert!(matches!(err, CommerceError::InvalidOrderStatusTransition { .. }));
    assert_eq!(h.stock(lamp).await, 3);
}

#[tokio::test]
async fn test_cancel_skips_deleted_products() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, lamp) = placed_order(&h, &shopper).await;
    h.commerce.catalog.delete_product(&h.staff, lamp).await.unwrap();

    let order = h.commerce.orders.cancel(&h.staff, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_other_users_order_is_denied() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;
    let stranger = h.shopper();

    assert!(matches!(
        h.commerce.orders.order(&stranger, order.id).await,
        Err(CommerceError::OrderAccessDenied(_))
    ));
    assert!(matches!(
        h.commerce.orders.cancel(&stranger, order.id).await,
        Err(CommerceError::OrderAccessDenied(_))
    ));
    assert!(h.commerce.orders.order(&h.staff, order.id).await.is_ok());
}

#[tokio::test]
async fn test_unknown_order() {
    let h = Harness::new();
    let missing = OrderId::generate();
    let err = h.commerce.orders.complete(&h.staff, missing).await.unwrap_err();
    assert!(matches!(err, CommerceError::OrderNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_webhook_single_step_only() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;

    let paid = PaymentWebhook::from_json(&format!(
        r#"{{"order_id":"{}","status":"processing","payment_method":"paypal"}}"#,
        order.id
    ))
    .unwrap();
    let order = h
        .commerce
        .orders
        .apply_payment_webhook(&h.staff, paid.clone())
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_method.as_deref(), Some("paypal"));

    // processing -> processing is not a step
    assert!(matches!(
        h.commerce.orders.apply_payment_webhook(&h.staff, paid).await,
        Err(CommerceError::InvalidOrderStatusTransition { .. })
    ));
}

#[tokio::test]
async fn test_webhook_cannot_ship_or_complete() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (order, _) = placed_order(&h, &shopper).await;
    h.commerce.orders.confirm_payment(&h.staff, order.id, None).await.unwrap();

    for status in [OrderStatus::Shipped, OrderStatus::Completed] {
        let webhook = PaymentWebhook {
            order_id: order.id,
            status,
            payment_method: None,
        };
        assert!(matches!(
            h.commerce.orders.apply_payment_webhook(&h.staff, webhook).await,
            Err(CommerceError::Validation(_))
        ));
    }

    let reloaded = h.commerce.orders.order(&h.staff, order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Processing);
    assert!(reloaded.tracking_number.is_none());
}

#[tokio::test]
async fn test_order_listings() {
    let h = Harness::new();
    let shopper = h.shopper();
    let (first, _) = placed_order(&h, &shopper).await;

    h.clock.advance(chrono::Duration::minutes(5));
    let pen = h.product("PEN-01", 200, 5).await;
    h.commerce.carts.add_item(&shopper, pen.id, 1).await.unwrap();
    let second = h
        .commerce
        .checkout
        .checkout(&shopper, AddressId::generate())
        .await
        .unwrap();
    h.commerce.orders.confirm_payment(&h.staff, second.id, None).await.unwrap();

    let mine: Vec<_> = h
        .commerce
        .orders
        .my_orders(&shopper)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(mine, vec![second.id, first.id]);

    let pending = h
        .commerce
        .orders
        .all_orders(&h.staff, Some(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, first.id);

    assert!(h.commerce.orders.all_orders(&shopper, None).await.is_err());
    assert!(h.commerce.orders.my_orders(&h.shopper()).await.unwrap().is_empty());
}
