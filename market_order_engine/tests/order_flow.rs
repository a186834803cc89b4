//! Order creation: totals, stock accounting, cart consumption, and rollback on failure.

mod support;

use market_order_engine::{
    db_types::{OrderStatus, PaymentStatus},
    traits::{OrderFlowError, OrderManagement},
};
use mos_common::Money;
use support::*;

#[tokio::test]
async fn order_totals_and_side_effects() {
    let db = prepare_test_db("order_totals").await;
    let api = flow_api(&db);
    let product = seed_product(&db, "seller-1", "Walnut chessboard", 1000, 7).await;
    fill_cart(&db, "alice", product.id, 2).await;

    let (order, items) = api.place_order("alice", order_request()).await.expect("Order should be created");

    // $10.00 x 2 at 10% tax and $10 flat shipping
    assert_eq!(order.subtotal, Money::from_cents(2000));
    assert_eq!(order.tax, Money::from_cents(200));
    assert_eq!(order.shipping, Money::from_cents(1000));
    assert_eq!(order.total, Money::from_cents(3200));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(order.order_number.as_str().starts_with("MO-"));

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].price, Money::from_cents(1000));
    assert_eq!(items[0].total, Money::from_cents(2000));
    // line totals sum to the subtotal
    let line_sum: Money = items.iter().map(|i| i.total).sum();
    assert_eq!(line_sum, order.subtotal);

    // stock decremented by exactly the ordered quantity, cart emptied
    assert_eq!(stock_of(&db, product.id).await, 5);
    assert!(db.fetch_cart("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_reservation_rolls_back_everything() {
    let db = prepare_test_db("rollback").await;
    let api = flow_api(&db);
    let plentiful = seed_product(&db, "seller-1", "Canvas tote", 500, 10).await;
    let scarce = seed_product(&db, "seller-2", "Hand-blown vase", 4500, 3).await;
    fill_cart(&db, "bob", plentiful.id, 2).await;
    fill_cart(&db, "bob", scarce.id, 5).await;

    let err = api.place_order("bob", order_request()).await.expect_err("Order should fail");
    match err {
        OrderFlowError::InsufficientStock { product_id, requested } => {
            assert_eq!(product_id, scarce.id);
            assert_eq!(requested, 5);
        },
        e => panic!("Expected InsufficientStock, got {e}"),
    }

    // no partial reservation survives, the cart is intact, and no order exists
    assert_eq!(stock_of(&db, plentiful.id).await, 10);
    assert_eq!(stock_of(&db, scarce.id).await, 3);
    assert_eq!(db.fetch_cart("bob").await.unwrap().len(), 2);
    assert!(db.fetch_orders_for_user("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let db = prepare_test_db("empty_cart").await;
    let api = flow_api(&db);
    let err = api.place_order("nobody", order_request()).await.expect_err("Order should fail");
    assert!(matches!(err, OrderFlowError::EmptyCart(_)));
}

#[tokio::test]
async fn inactive_product_is_rejected() {
    let db = prepare_test_db("inactive").await;
    let api = flow_api(&db);
    let product = seed_product(&db, "seller-1", "Retired print", 2500, 4).await;
    fill_cart(&db, "carol", product.id, 1).await;
    db.set_product_active(product.id, false).await.unwrap();

    let err = api.place_order("carol", order_request()).await.expect_err("Order should fail");
    assert!(matches!(err, OrderFlowError::ProductUnavailable(id) if id == product.id));
    assert_eq!(stock_of(&db, product.id).await, 4);
}

#[tokio::test]
async fn item_prices_are_locked_at_snapshot() {
    let db = prepare_test_db("price_lock").await;
    let api = flow_api(&db);
    let product = seed_product(&db, "seller-1", "Linen shirt", 3000, 5).await;
    fill_cart(&db, "dan", product.id, 1).await;

    let (order, items) = api.place_order("dan", order_request()).await.unwrap();
    assert_eq!(items[0].price, Money::from_cents(3000));

    // a later price hike must not touch the historical record
    sqlx::query("UPDATE products SET price = 9900 WHERE id = $1")
        .bind(product.id)
        .execute(db.pool())
        .await
        .unwrap();
    let stored = db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(stored[0].price, Money::from_cents(3000));
    let stored_order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored_order.subtotal, Money::from_cents(3000));
}
