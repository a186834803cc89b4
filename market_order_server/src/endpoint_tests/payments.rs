use actix_web::{http::StatusCode, web, web::ServiceConfig};
use market_order_engine::{PaymentsApi, RefundApi};
use serde_json::json;

use super::{
    helpers::{get_request, post_json},
    mocks::{sample_order, MockFlowBackend},
};
use crate::{
    config::ServerConfig,
    data_objects::PaymentConfigResponse,
    integrations::stripe::StripeGateway,
    payment_routes::{configure_payment_routes, payment_config},
};

/// Installs the payment routes against a disabled gateway.
fn install_disabled(cfg: &mut ServiceConfig, backend: MockFlowBackend) {
    let payments = PaymentsApi::new(backend, StripeGateway::disabled(), "usd".to_string());
    let refunds = RefundApi::new(MockFlowBackend::new(), StripeGateway::disabled());
    cfg.app_data(web::Data::new(payments))
        .app_data(web::Data::new(refunds))
        .app_data(web::Data::new(ServerConfig::default()))
        .configure(configure_payment_routes::<MockFlowBackend, StripeGateway>);
}

#[actix_web::test]
async fn intent_with_gateway_disabled_is_503() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, "alice"))));
        install_disabled(cfg, backend);
    }
    let (status, body) =
        post_json(Some(("alice", "customer")), "/payment/intent", json!({ "order_id": 1 }), configure).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("not enabled"));
}

#[actix_web::test]
async fn checkout_with_gateway_disabled_is_503() {
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockFlowBackend::new();
        backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, "alice"))));
        install_disabled(cfg, backend);
    }
    let body = json!({ "order_id": 1, "items": [{ "product_id": 11, "quantity": 2, "price": 1000 }] });
    let (status, _) = post_json(Some(("alice", "customer")), "/payment/checkout", body, configure).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn refunds_are_admin_only() {
    fn configure(cfg: &mut ServiceConfig) {
        install_disabled(cfg, MockFlowBackend::new());
    }
    let (status, _) = post_json(Some(("alice", "customer")), "/payment/refund/1", json!({}), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn payment_endpoints_require_identity() {
    fn configure(cfg: &mut ServiceConfig) {
        install_disabled(cfg, MockFlowBackend::new());
    }
    let (status, _) = post_json(None, "/payment/intent", json!({ "order_id": 1 }), configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn payment_config_reflects_a_disabled_gateway() {
    fn configure(cfg: &mut ServiceConfig) {
        let public_config = PaymentConfigResponse {
            enabled: false,
            publishable_key: String::new(),
            supported_methods: vec!["card".to_string()],
            supported_currencies: vec!["usd".to_string()],
        };
        cfg.app_data(web::Data::new(public_config)).route("/payment/config", web::get().to(payment_config));
    }
    let (status, body) = get_request(None, "/payment/config", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"enabled\":false"));
    assert!(body.contains("card"));
}
