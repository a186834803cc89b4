use std::fmt::Debug;

use log::*;
use mos_common::Money;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    db_types::{Order, PaymentStatus},
    traits::{
        CheckoutItem,
        CheckoutSessionHandle,
        OrderFlowDatabase,
        OrderFlowError,
        OrderQueryError,
        PaymentIntentHandle,
        PaymentProcessor,
        ProcessorError,
    },
};

/// A checkout line as submitted by the client. The display name and description always come from the current
/// product record, not from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItemRequest {
    pub product_id: i64,
    pub quantity: i64,
    pub price: Money,
}

/// `PaymentsApi` drives payment creation against the gateway and stores the returned correlation ids on the
/// order, so that later webhook events can be matched back.
pub struct PaymentsApi<B, P> {
    db: B,
    processor: P,
    currency: String,
}

impl<B, P> Debug for PaymentsApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentsApi")
    }
}

impl<B, P> PaymentsApi<B, P> {
    pub fn new(db: B, processor: P, currency: String) -> Self {
        Self { db, processor, currency }
    }
}

impl<B, P> PaymentsApi<B, P>
where
    B: OrderFlowDatabase,
    P: PaymentProcessor,
{
    pub fn is_enabled(&self) -> bool {
        self.processor.is_configured()
    }

    /// Creates a payment intent for an order and stores the intent id on it. The order must still have a
    /// pending payment. `amount` defaults to the order total; `currency` to the store currency.
    pub async fn create_intent(
        &self,
        order_id: i64,
        amount: Option<Money>,
        currency: Option<&str>,
    ) -> Result<(PaymentIntentHandle, Order), PaymentApiError> {
        if !self.processor.is_configured() {
            return Err(PaymentApiError::Gateway(ProcessorError::NotConfigured));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(PaymentApiError::OrderNotFound(order_id))?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(PaymentApiError::NotPayable(format!("payment is already {}", order.payment_status)));
        }
        let amount = amount.unwrap_or(order.total);
        let currency = currency.unwrap_or(self.currency.as_str());
        let handle = self.processor.create_payment_intent(&order, amount, currency).await?;
        let order = self.db.store_payment_intent(order_id, &handle.payment_intent_id).await?;
        info!("💳️ Payment intent {} attached to order {}", handle.payment_intent_id, order.order_number);
        Ok((handle, order))
    }

    /// Creates a hosted checkout session. Line items carry the client-confirmed unit price but the display
    /// name comes from the product catalog.
    pub async fn create_checkout(
        &self,
        order_id: i64,
        requested: &[CheckoutItemRequest],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(CheckoutSessionHandle, Order), PaymentApiError> {
        if !self.processor.is_configured() {
            return Err(PaymentApiError::Gateway(ProcessorError::NotConfigured));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(PaymentApiError::OrderNotFound(order_id))?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(PaymentApiError::NotPayable(format!("payment is already {}", order.payment_status)));
        }
        let mut items = Vec::with_capacity(requested.len());
        for line in requested {
            let product = self
                .db
                .fetch_product(line.product_id)
                .await?
                .ok_or(PaymentApiError::NotPayable(format!("product {} does not exist", line.product_id)))?;
            items.push(CheckoutItem { name: product.name, unit_price: line.price, quantity: line.quantity });
        }
        let handle =
            self.processor.create_checkout_session(&order, &items, &self.currency, success_url, cancel_url).await?;
        let order = self.db.store_checkout_session(order_id, &handle.session_id).await?;
        info!("💳️ Checkout session {} attached to order {}", handle.session_id, order.order_number);
        Ok((handle, order))
    }

    /// Raw pass-through read of the gateway's view of a payment intent.
    pub async fn payment_details(&self, payment_intent_id: &str) -> Result<serde_json::Value, PaymentApiError> {
        if !self.processor.is_configured() {
            return Err(PaymentApiError::Gateway(ProcessorError::NotConfigured));
        }
        Ok(self.processor.fetch_payment_details(payment_intent_id).await?)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

#[derive(Debug, Error)]
pub enum PaymentApiError {
    #[error(transparent)]
    Flow(#[from] OrderFlowError),
    #[error(transparent)]
    Gateway(#[from] ProcessorError),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The order cannot be paid: {0}")]
    NotPayable(String),
}

impl From<OrderQueryError> for PaymentApiError {
    fn from(e: OrderQueryError) -> Self {
        PaymentApiError::Flow(OrderFlowError::Query(e))
    }
}
