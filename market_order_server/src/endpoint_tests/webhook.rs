use actix_web::{http::StatusCode, web, web::ServiceConfig};
use market_order_engine::{
    db_types::{OrderStatus, PaymentStatus, WebhookOutcome},
    events::EventProducers,
    traits::OrderFlowError,
    WebhookReconciler,
};
use serde_json::json;
use stripe_tools::signature;

use super::{
    helpers::post_raw,
    mocks::{sample_order, MockFlowBackend},
};
use crate::{
    config::GatewayConfig,
    integrations::stripe::WebhookVerifier,
    payment_routes::{payment_webhook, SIGNATURE_HEADER},
};

const SECRET: &str = "whsec_endpoint_test";

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        enabled: true,
        webhook_secret: mos_common::Secret::new(SECRET.to_string()),
        signature_tolerance_secs: signature::DEFAULT_TOLERANCE_SECS,
        ..GatewayConfig::default()
    }
}

fn install(cfg: &mut ServiceConfig, backend: MockFlowBackend) {
    let reconciler = WebhookReconciler::new(backend, EventProducers::default());
    cfg.app_data(web::Data::new(reconciler))
        .app_data(web::Data::new(WebhookVerifier::new(&gateway_config())))
        .route("/payment/webhook", web::post().to(payment_webhook::<MockFlowBackend>));
}

fn succeeded_payload() -> Vec<u8> {
    json!({
        "id": "evt_hook_1",
        "type": "payment_intent.succeeded",
        "created": 1_720_000_000,
        "data": { "object": {
            "id": "pi_1",
            "amount_received": 3200,
            "currency": "usd",
            "metadata": { "order_id": "1" }
        }}
    })
    .to_string()
    .into_bytes()
}

#[actix_web::test]
async fn tampered_deliveries_are_rejected_without_side_effects() {
    fn configure(cfg: &mut ServiceConfig) {
        // no expectations: any call on the backend fails the test
        install(cfg, MockFlowBackend::new());
    }
    let payload = succeeded_payload();
    let header = signature::signature_header("whsec_wrong_secret", &payload);
    let (status, body) =
        post_raw("/payment/webhook", payload, vec![(SIGNATURE_HEADER, header)], configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid webhook signature"));
}

#[actix_web::test]
async fn missing_signature_header_is_rejected() {
    fn configure(cfg: &mut ServiceConfig) {
        install(cfg, MockFlowBackend::new());
    }
    let (status, _) = post_raw("/payment/webhook", succeeded_payload(), vec![], configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn verified_deliveries_are_applied_and_acknowledged() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_apply_payment_event().returning(|event| {
            assert_eq!(event.event_id, "evt_hook_1");
            assert_eq!(event.order_id, Some(1));
            let mut order = sample_order(1, "alice");
            order.status = OrderStatus::Processing;
            order.payment_status = PaymentStatus::Completed;
            Ok(WebhookOutcome::Applied(order))
        });
        install(cfg, backend);
    }
    let payload = succeeded_payload();
    let header = signature::signature_header(SECRET, &payload);
    let (status, body) =
        post_raw("/payment/webhook", payload, vec![(SIGNATURE_HEADER, header)], configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn storage_failures_surface_as_5xx_for_redelivery() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend
            .expect_apply_payment_event()
            .returning(|_| Err(OrderFlowError::DatabaseError("connection pool exhausted".to_string())));
        install(cfg, backend);
    }
    let payload = succeeded_payload();
    let header = signature::signature_header(SECRET, &payload);
    let (status, _) = post_raw("/payment/webhook", payload, vec![(SIGNATURE_HEADER, header)], configure).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
