use market_order_engine::{
    db_types::{NewOrderRequest, Order, OrderItem, OrderStatus, RefundRecord},
    CheckoutItemRequest,
};
use mos_common::Money;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;

/// `POST /api/orders` request body. Mirrors [`NewOrderRequest`]; kept separate so the wire format can evolve
/// without touching the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderPayload {
    pub shipping_address: market_order_engine::db_types::ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<NewOrderPayload> for NewOrderRequest {
    fn from(p: NewOrderPayload) -> Self {
        NewOrderRequest { shipping_address: p.shipping_address, payment_method: p.payment_method, notes: p.notes }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelOrderPayload {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentPayload {
    pub order_id: i64,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutPayload {
    pub order_id: i64,
    pub items: Vec<CheckoutItemRequest>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundPayload {
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResponse {
    pub order: Order,
    pub refund: RefundRecord,
}

/// `GET /payment/config`: what a storefront needs to know to start a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfigResponse {
    pub enabled: bool,
    pub publishable_key: String,
    pub supported_methods: Vec<String>,
    pub supported_currencies: Vec<String>,
}

impl PaymentConfigResponse {
    pub fn from_config(gateway: &GatewayConfig, currency: &str) -> Self {
        Self {
            enabled: gateway.enabled,
            publishable_key: gateway.publishable_key.clone(),
            supported_methods: vec!["card".to_string()],
            supported_currencies: vec![currency.to_string()],
        }
    }
}
