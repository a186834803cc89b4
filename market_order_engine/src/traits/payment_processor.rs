use mos_common::Money;
use thiserror::Error;

use crate::db_types::Order;

/// Correlation handles returned by the gateway when a payment intent is created. The `client_secret` goes to
/// the browser; the id is stored on the order.
#[derive(Debug, Clone)]
pub struct PaymentIntentHandle {
    pub payment_intent_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionHandle {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct GatewayRefund {
    pub refund_id: String,
    pub amount: Money,
    pub status: String,
}

/// A display line for a hosted checkout page, built from current product data.
#[derive(Debug, Clone)]
pub struct CheckoutItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

/// The payment gateway, as the engine sees it.
///
/// Every mutating call checks [`PaymentProcessor::is_configured`] first and fails fast with
/// [`ProcessorError::NotConfigured`] when the gateway is feature-flagged off; callers translate that into a
/// 503 rather than a crash. Implementations bound outbound calls with a request timeout; a timed-out call
/// surfaces as [`ProcessorError::Transport`] and is safe to retry, since no charge is recorded until a
/// webhook confirms it.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    fn is_configured(&self) -> bool;

    async fn create_payment_intent(
        &self,
        order: &Order,
        amount: Money,
        currency: &str,
    ) -> Result<PaymentIntentHandle, ProcessorError>;

    async fn create_checkout_session(
        &self,
        order: &Order,
        items: &[CheckoutItem],
        currency: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSessionHandle, ProcessorError>;

    /// `amount = None` refunds the full remaining captured amount.
    async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<GatewayRefund, ProcessorError>;

    /// Raw pass-through read of the gateway's view of a payment.
    async fn fetch_payment_details(&self, payment_intent_id: &str) -> Result<serde_json::Value, ProcessorError>;
}

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("The payment gateway is not configured")]
    NotConfigured,
    #[error("The payment gateway rejected the request ({status}). {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not reach the payment gateway. {0}")]
    Transport(String),
    #[error("The payment gateway returned an unusable response. {0}")]
    InvalidResponse(String),
}
