use std::fmt::Debug;

use log::*;
use mos_common::Money;
use thiserror::Error;

use crate::{
    db_types::{NewRefund, Order, PaymentStatus, RefundRecord},
    traits::{OrderFlowDatabase, OrderFlowError, OrderQueryError, PaymentProcessor, ProcessorError},
};

/// `RefundApi` coordinates refunds between the captured payment, the gateway and the order record.
///
/// The invariant it owns: the sum of refunds recorded against an order never exceeds the captured amount.
/// Refunds key off the payment state alone — an order that was cancelled after its payment captured can
/// still be refunded; only the refund markers change in that case, never the order status.
pub struct RefundApi<B, P> {
    db: B,
    processor: P,
}

impl<B, P> Debug for RefundApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefundApi")
    }
}

impl<B, P> RefundApi<B, P> {
    pub fn new(db: B, processor: P) -> Self {
        Self { db, processor }
    }
}

impl<B, P> RefundApi<B, P>
where
    B: OrderFlowDatabase,
    P: PaymentProcessor,
{
    /// Refunds `amount` of the order's captured payment, or the full remaining capture when `amount` is
    /// omitted.
    ///
    /// On gateway failure the order is marked `RefundPending` for retry and the error is surfaced — the call
    /// never reports success it cannot prove.
    pub async fn refund(
        &self,
        order_id: i64,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<(Order, RefundRecord), RefundError> {
        if !self.processor.is_configured() {
            return Err(RefundError::Gateway(ProcessorError::NotConfigured));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(RefundError::OrderNotFound(order_id))?;
        if order.payment_status != PaymentStatus::Completed {
            return Err(RefundError::NotRefundable(format!(
                "the payment status is {}, only Completed payments can be refunded",
                order.payment_status
            )));
        }
        let captured = order.captured_amount.unwrap_or(order.total);
        let refunded = self.db.total_refunded(order_id).await?;
        let remaining = captured - refunded;
        if !remaining.is_positive() {
            return Err(RefundError::NotRefundable("the captured amount is fully refunded".to_string()));
        }
        let amount = amount.unwrap_or(remaining);
        if !amount.is_positive() || amount > remaining {
            return Err(RefundError::ExceedsCaptured { requested: amount, remaining });
        }
        let intent_id = order
            .payment_intent_id
            .clone()
            .ok_or_else(|| RefundError::NotRefundable("the order has no captured payment intent".to_string()))?;
        debug!("💸️ Requesting refund of {amount} against order {} ({intent_id})", order.order_number);
        let refund = match self.processor.refund_payment(&intent_id, Some(amount), reason).await {
            Ok(refund) => refund,
            Err(e) => {
                warn!("💸️ Gateway refused the refund for order {}: {e}. Marking the order RefundPending.", order.order_number);
                self.db.mark_refund_pending(order_id).await?;
                return Err(RefundError::Gateway(e));
            },
        };
        let new_refund = NewRefund {
            refund_id: refund.refund_id,
            amount,
            reason: reason.map(str::to_string),
            status: refund.status,
        };
        let (order, record) = self.db.record_refund(order_id, new_refund).await?;
        info!(
            "💸️ Refund {} of {amount} recorded against order {}. Refund status: {}",
            record.refund_id,
            order.order_number,
            order.refund_status.map(|s| s.to_string()).unwrap_or_else(|| "None".to_string())
        );
        Ok((order, record))
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

#[derive(Debug, Error)]
pub enum RefundError {
    #[error(transparent)]
    Flow(#[from] OrderFlowError),
    #[error(transparent)]
    Gateway(#[from] ProcessorError),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The order cannot be refunded: {0}")]
    NotRefundable(String),
    #[error("Refund of {requested} exceeds the remaining captured amount of {remaining}")]
    ExceedsCaptured { requested: Money, remaining: Money },
}

impl From<OrderQueryError> for RefundError {
    fn from(e: OrderQueryError) -> Self {
        RefundError::Flow(OrderFlowError::Query(e))
    }
}
