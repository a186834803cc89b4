//! Webhook reconciliation: idempotent per event id, out-of-order safe, and never a hard failure for
//! unresolvable events.

mod support;

use market_order_engine::{
    db_types::{GatewayEvent, GatewayEventKind, OrderStatus, PaymentStatus, WebhookOutcome},
    traits::OrderManagement,
};
use mos_common::Money;
use support::*;

async fn pending_order(db: &market_order_engine::SqliteDatabase, user: &str) -> market_order_engine::db_types::Order {
    let product = seed_product(db, "seller-1", "Field notebook", 1200, 50).await;
    fill_cart(db, user, product.id, 1).await;
    let (order, _) = flow_api(db).place_order(user, order_request()).await.expect("Order should be created");
    order
}

#[tokio::test]
async fn success_event_confirms_payment() {
    let db = prepare_test_db("wh_success").await;
    let order = pending_order(&db, "alice").await;
    let outcome = reconciler(&db).process_event(paid_event("evt_1", order.id, 2310)).await.unwrap();

    let updated = match outcome {
        WebhookOutcome::Applied(order) => order,
        other => panic!("Expected Applied, got {other:?}"),
    };
    assert_eq!(updated.status, OrderStatus::Processing);
    assert_eq!(updated.payment_status, PaymentStatus::Completed);
    assert_eq!(updated.captured_amount, Some(Money::from_cents(2310)));
    assert_eq!(updated.captured_currency.as_deref(), Some("usd"));
}

#[tokio::test]
async fn replayed_event_is_applied_once() {
    let db = prepare_test_db("wh_replay").await;
    let order = pending_order(&db, "bob").await;
    let api = reconciler(&db);

    let first = api.process_event(paid_event("evt_dup", order.id, 2310)).await.unwrap();
    assert!(matches!(first, WebhookOutcome::Applied(_)));
    let second = api.process_event(paid_event("evt_dup", order.id, 2310)).await.unwrap();
    assert!(matches!(second, WebhookOutcome::AlreadyProcessed));

    // same observable state as a single delivery, and a single dedup record
    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Processing);
    assert_eq!(stored.payment_status, PaymentStatus::Completed);
    assert!(db.fetch_payment_event("evt_dup").await.unwrap().is_some());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_events WHERE order_id = $1")
        .bind(order.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn expired_event_after_completion_is_superseded() {
    let db = prepare_test_db("wh_out_of_order").await;
    let order = pending_order(&db, "carol").await;
    let api = reconciler(&db);

    api.process_event(paid_event("evt_paid", order.id, 2310)).await.unwrap();
    let outcome = api.process_event(expired_event("evt_late_expiry", order.id)).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored(_)));

    // the resolved payment is not reverted
    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Completed);
    assert_eq!(stored.status, OrderStatus::Processing);
}

#[tokio::test]
async fn failed_payment_leaves_order_pending_for_retry() {
    let db = prepare_test_db("wh_failed").await;
    let order = pending_order(&db, "dan").await;
    let outcome =
        reconciler(&db).process_event(failed_event("evt_failed", order.id, "card_declined")).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Applied(_)));

    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Failed);
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.failure_reason.as_deref(), Some("card_declined"));
}

#[tokio::test]
async fn checkout_completed_behaves_like_payment_success() {
    let db = prepare_test_db("wh_checkout").await;
    let order = pending_order(&db, "erin").await;
    let outcome =
        reconciler(&db).process_event(checkout_completed_event("evt_cs", order.id, 2310)).await.unwrap();
    let updated = match outcome {
        WebhookOutcome::Applied(order) => order,
        other => panic!("Expected Applied, got {other:?}"),
    };
    assert_eq!(updated.status, OrderStatus::Processing);
    assert_eq!(updated.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn expired_checkout_resolves_pending_payment() {
    let db = prepare_test_db("wh_expired").await;
    let order = pending_order(&db, "frank").await;
    let outcome = reconciler(&db).process_event(expired_event("evt_exp", order.id)).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Applied(_)));
    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Expired);
}

#[tokio::test]
async fn unresolvable_and_unknown_events_are_acknowledged() {
    let db = prepare_test_db("wh_ignored").await;
    let api = reconciler(&db);

    // no order id in the metadata
    let orphan = GatewayEvent { order_id: None, ..paid_event("evt_orphan", 0, 100) };
    assert!(matches!(api.process_event(orphan).await.unwrap(), WebhookOutcome::Ignored(_)));

    // order id that resolves to nothing
    let ghost = paid_event("evt_ghost", 999_999, 100);
    assert!(matches!(api.process_event(ghost).await.unwrap(), WebhookOutcome::Ignored(_)));

    // kinds the engine does not act on
    let unknown = GatewayEvent {
        event_id: "evt_unknown".to_string(),
        kind: GatewayEventKind::Other("customer.created".to_string()),
        order_id: Some(1),
        amount: None,
        currency: None,
        failure_reason: None,
    };
    assert!(matches!(api.process_event(unknown).await.unwrap(), WebhookOutcome::Ignored(_)));
}
