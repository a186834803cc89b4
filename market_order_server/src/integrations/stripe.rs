//! Adapts the [`stripe_tools`] client to the engine's [`PaymentProcessor`] trait, and converts inbound
//! Stripe events into the engine's provider-agnostic [`GatewayEvent`].

use log::*;
use market_order_engine::{
    db_types::{GatewayEvent, GatewayEventKind, Order},
    traits::{
        CheckoutItem,
        CheckoutSessionHandle,
        GatewayRefund,
        PaymentIntentHandle,
        PaymentProcessor,
        ProcessorError,
    },
};
use mos_common::{Money, Secret};
use serde_json::Value;
use stripe_tools::{
    signature::{verify_signature, SignatureError},
    Event,
    NewCheckoutSession,
    SessionLineItem,
    StripeApi,
    StripeApiError,
    StripeConfig,
};

use crate::{config::GatewayConfig, errors::ServerError};

/// The metadata key that carries the order correlation id on intents and sessions.
const ORDER_ID_KEY: &str = "order_id";

/// The engine-facing payment gateway. When the gateway is disabled by configuration, the inner client is
/// absent and every call fails fast with `NotConfigured`.
#[derive(Clone)]
pub struct StripeGateway {
    api: Option<StripeApi>,
}

impl StripeGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, ServerError> {
        if !config.enabled {
            info!("💳️ Payment gateway is disabled by configuration");
            return Ok(Self { api: None });
        }
        let mut stripe_config = StripeConfig::new(
            config.secret_key.clone(),
            config.publishable_key.clone(),
            config.webhook_secret.clone(),
        )
        .with_timeout(config.timeout);
        if let Some(base) = &config.api_base {
            stripe_config = stripe_config.with_api_base(base.clone());
        }
        let api = StripeApi::new(stripe_config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api: Some(api) })
    }

    pub fn disabled() -> Self {
        Self { api: None }
    }

    fn api(&self) -> Result<&StripeApi, ProcessorError> {
        self.api.as_ref().ok_or(ProcessorError::NotConfigured)
    }
}

impl PaymentProcessor for StripeGateway {
    fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    async fn create_payment_intent(
        &self,
        order: &Order,
        amount: Money,
        currency: &str,
    ) -> Result<PaymentIntentHandle, ProcessorError> {
        let api = self.api()?;
        let metadata = vec![
            (ORDER_ID_KEY.to_string(), order.id.to_string()),
            ("order_number".to_string(), order.order_number.to_string()),
        ];
        let intent = api.create_payment_intent(amount, currency, &metadata).await.map_err(convert_error)?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| ProcessorError::InvalidResponse("payment intent has no client secret".to_string()))?;
        Ok(PaymentIntentHandle { payment_intent_id: intent.id, client_secret })
    }

    async fn create_checkout_session(
        &self,
        order: &Order,
        items: &[CheckoutItem],
        currency: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSessionHandle, ProcessorError> {
        let api = self.api()?;
        let new_session = NewCheckoutSession {
            currency: currency.to_string(),
            line_items: items
                .iter()
                .map(|i| SessionLineItem { name: i.name.clone(), unit_amount: i.unit_price, quantity: i.quantity })
                .collect(),
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
            metadata: vec![(ORDER_ID_KEY.to_string(), order.id.to_string())],
        };
        let session = api.create_checkout_session(&new_session).await.map_err(convert_error)?;
        let url = session
            .url
            .ok_or_else(|| ProcessorError::InvalidResponse("checkout session has no redirect url".to_string()))?;
        Ok(CheckoutSessionHandle { session_id: session.id, url })
    }

    async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<GatewayRefund, ProcessorError> {
        let api = self.api()?;
        let refund = api.create_refund(payment_intent_id, amount, reason).await.map_err(convert_error)?;
        Ok(GatewayRefund {
            refund_id: refund.id,
            amount: Money::from_cents(refund.amount),
            status: refund.status,
        })
    }

    async fn fetch_payment_details(&self, payment_intent_id: &str) -> Result<Value, ProcessorError> {
        let api = self.api()?;
        api.get_payment_intent(payment_intent_id).await.map_err(convert_error)
    }
}

fn convert_error(e: StripeApiError) -> ProcessorError {
    match e {
        StripeApiError::QueryError { status, message } => ProcessorError::Rejected { status, message },
        StripeApiError::RestResponseError(msg) => ProcessorError::Transport(msg),
        StripeApiError::JsonError(msg) | StripeApiError::Initialization(msg) => {
            ProcessorError::InvalidResponse(msg)
        },
    }
}

/// Verifies the authenticity of webhook deliveries against the shared signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Secret<String>,
    tolerance_secs: i64,
    enabled: bool,
}

impl WebhookVerifier {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            secret: config.webhook_secret.clone(),
            tolerance_secs: config.signature_tolerance_secs,
            enabled: config.enabled,
        }
    }

    pub fn verify(&self, header: &str, payload: &[u8]) -> Result<(), ServerError> {
        if !self.enabled {
            warn!("🔐️ Webhook delivery received while the gateway is disabled. Rejecting.");
            return Err(ServerError::WebhookAuthError);
        }
        verify_signature(self.secret.reveal(), header, payload, self.tolerance_secs).map_err(|e| {
            match e {
                SignatureError::MalformedHeader(m) => warn!("🔐️ Malformed webhook signature header: {m}"),
                SignatureError::StaleTimestamp => warn!("🔐️ Webhook signature timestamp out of tolerance"),
                SignatureError::Mismatch => warn!("🔐️ Webhook signature mismatch"),
            }
            ServerError::WebhookAuthError
        })
    }
}

/// Converts a verified Stripe event into the engine's view of it. Unknown event types map to
/// [`GatewayEventKind::Other`], which the reconciler acknowledges without effect.
pub fn gateway_event_from_stripe(event: &Event) -> GatewayEvent {
    let kind = match event.event_type.as_str() {
        "payment_intent.succeeded" => GatewayEventKind::PaymentSucceeded,
        "payment_intent.payment_failed" => GatewayEventKind::PaymentFailed,
        "checkout.session.completed" => GatewayEventKind::CheckoutCompleted,
        "checkout.session.expired" => GatewayEventKind::CheckoutExpired,
        other => GatewayEventKind::Other(other.to_string()),
    };
    let order_id = event.metadata_value(ORDER_ID_KEY).and_then(|v| v.parse::<i64>().ok());
    if order_id.is_none() && !matches!(kind, GatewayEventKind::Other(_)) {
        debug!("🔔️ Event {} has no usable {ORDER_ID_KEY} metadata", event.id);
    }
    let object = event.object();
    // intents report `amount_received`, checkout sessions `amount_total`
    let amount = object
        .get("amount_received")
        .or_else(|| object.get("amount_total"))
        .and_then(Value::as_i64)
        .map(Money::from_cents);
    let currency = object.get("currency").and_then(Value::as_str).map(str::to_string);
    let failure_reason = object
        .get("last_payment_error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    GatewayEvent { event_id: event.id.clone(), kind, order_id, amount, currency, failure_reason }
}
