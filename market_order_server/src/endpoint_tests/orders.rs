use actix_web::{http::StatusCode, web, web::ServiceConfig};
use market_order_engine::{
    db_types::OrderStatus,
    events::EventProducers,
    helpers::PricingPolicy,
    traits::OrderFlowError,
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::{get_request, post_json, put_json},
    mocks::{sample_items, sample_order, MockFlowBackend},
};
use crate::routes::configure_order_routes;

fn order_payload() -> serde_json::Value {
    json!({
        "shipping_address": {
            "street": "12 Harbour Lane",
            "city": "Port Devon",
            "state": "WC",
            "zip_code": "8001",
            "country": "ZA"
        },
        "payment_method": "card"
    })
}

fn install(cfg: &mut ServiceConfig, backend: MockFlowBackend) {
    let api = OrderFlowApi::new(backend, PricingPolicy::default(), EventProducers::default());
    cfg.app_data(web::Data::new(api)).configure(configure_order_routes::<MockFlowBackend>);
}

#[actix_web::test]
async fn create_order_returns_201() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend
            .expect_create_order_from_cart()
            .returning(|user_id, _, _| Ok((sample_order(1, user_id), sample_items(1))));
        install(cfg, backend);
    }
    let (status, body) = post_json(Some(("alice", "customer")), "/orders", order_payload(), configure).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains("MO-1721039400000-0001"));
    assert!(body.contains("\"total\":3200"));
}

#[actix_web::test]
async fn create_order_without_identity_is_401() {
    fn configure(cfg: &mut ServiceConfig) {
        install(cfg, MockFlowBackend::new());
    }
    let (status, body) = post_json(None, "/orders", order_payload(), configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Authentication required"));
}

#[actix_web::test]
async fn create_order_with_insufficient_stock_is_400() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend
            .expect_create_order_from_cart()
            .returning(|_, _, _| Err(OrderFlowError::InsufficientStock { product_id: 11, requested: 2 }));
        install(cfg, backend);
    }
    let (status, body) = post_json(Some(("alice", "customer")), "/orders", order_payload(), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Insufficient stock for product 11"));
}

#[actix_web::test]
async fn buyers_can_read_their_own_orders() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, "alice"))));
        backend.expect_fetch_order_items().returning(|id| Ok(sample_items(id)));
        install(cfg, backend);
    }
    let (status, body) = get_request(Some(("alice", "customer")), "/orders/1", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"user_id\":\"alice\""));
}

#[actix_web::test]
async fn strangers_cannot_read_orders() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, "alice"))));
        backend.expect_order_contains_seller().returning(|_, _| Ok(false));
        install(cfg, backend);
    }
    let (status, body) = get_request(Some(("mallory", "customer")), "/orders/1", configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("access"));
}

#[actix_web::test]
async fn admins_can_read_any_order() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, "alice"))));
        backend.expect_fetch_order_items().returning(|id| Ok(sample_items(id)));
        install(cfg, backend);
    }
    let (status, _) = get_request(Some(("root", "admin")), "/orders/1", configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn sellers_of_a_contained_item_can_read_the_order() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, "alice"))));
        backend.expect_order_contains_seller().returning(|_, seller| Ok(seller == "seller-1"));
        backend.expect_fetch_order_items().returning(|id| Ok(sample_items(id)));
        install(cfg, backend);
    }
    let (status, _) = get_request(Some(("seller-1", "seller")), "/orders/1", configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn cancel_of_a_shipped_order_is_400() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| {
            let mut order = sample_order(id, "alice");
            order.status = OrderStatus::Shipped;
            Ok(Some(order))
        });
        backend.expect_transition_order().returning(|_, to| {
            Err(OrderFlowError::InvalidTransition { from: OrderStatus::Shipped, to })
        });
        install(cfg, backend);
    }
    let (status, body) = post_json(Some(("alice", "customer")), "/orders/1/cancel", json!({}), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("may not change from Shipped to Cancelled"));
}

#[actix_web::test]
async fn customers_cannot_change_order_status() {
    fn configure(cfg: &mut ServiceConfig) {
        install(cfg, MockFlowBackend::new());
    }
    let (status, _) =
        put_json(Some(("alice", "customer")), "/orders/1/status", json!({ "status": "Shipped" }), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admins_can_drive_fulfilment() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_transition_order().returning(|id, to| {
            let mut order = sample_order(id, "alice");
            order.status = to;
            Ok(order)
        });
        install(cfg, backend);
    }
    let (status, body) =
        put_json(Some(("root", "admin")), "/orders/1/status", json!({ "status": "Shipped" }), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Shipped\""));
}
