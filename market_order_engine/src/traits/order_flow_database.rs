use mos_common::Money;
use thiserror::Error;

use crate::{
    db_types::{GatewayEvent, NewOrderRequest, NewRefund, Order, OrderItem, OrderStatus, RefundRecord, WebhookOutcome},
    helpers::PricingPolicy,
    traits::{OrderManagement, OrderQueryError},
};

/// This trait defines the mutating, money- and stock-moving behaviour of an order-engine backend.
///
/// Each method is a single unit of work: it either completes entirely or leaves the store untouched.
/// Backends implement the atomicity with whatever their storage engine provides (the SQLite backend uses
/// write transactions); callers never see partial state.
#[allow(async_fn_in_trait)]
pub trait OrderFlowDatabase: OrderManagement {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    /// Turns the user's cart into a durable order, in one transaction:
    /// 1. snapshot the cart (price-locked lines),
    /// 2. reserve stock for every line with a conditional atomic decrement,
    /// 3. compute totals from the snapshot via the pricing policy,
    /// 4. persist the order and its items with `Pending`/`Pending` status,
    /// 5. clear the cart.
    ///
    /// A failed reservation aborts the whole operation with
    /// [`OrderFlowError::InsufficientStock`] naming the offending product; no partial reservation
    /// survives.
    async fn create_order_from_cart(
        &self,
        user_id: &str,
        request: NewOrderRequest,
        pricing: &PricingPolicy,
    ) -> Result<(Order, Vec<OrderItem>), OrderFlowError>;

    /// Moves an order along one edge of the state machine, applying the edge's side effects in the same
    /// transaction:
    /// * entering `Cancelled` releases the reserved stock of every item, exactly once;
    /// * entering `Shipped` stamps `shipped_at`;
    /// * entering `Delivered` stamps `delivered_at`.
    ///
    /// An edge not in the transition table fails with [`OrderFlowError::InvalidTransition`] and leaves the
    /// order unchanged.
    async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<Order, OrderFlowError>;

    /// Applies a verified gateway event, idempotently. The dedup record and the order mutation are written
    /// in one transaction so a crash cannot separate them. Replayed event ids return
    /// [`WebhookOutcome::AlreadyProcessed`]; events that would move the payment status backward are recorded
    /// but leave the order untouched.
    async fn apply_payment_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, OrderFlowError>;

    /// Stores the gateway correlation id for a payment intent on the order.
    async fn store_payment_intent(&self, order_id: i64, payment_intent_id: &str) -> Result<Order, OrderFlowError>;

    /// Stores the gateway correlation id for a checkout session on the order.
    async fn store_checkout_session(&self, order_id: i64, session_id: &str) -> Result<Order, OrderFlowError>;

    /// The sum of all refunds recorded against the order so far.
    async fn total_refunded(&self, order_id: i64) -> Result<Money, OrderFlowError>;

    /// Appends a refund record and updates the order's refund markers: `Refunded` when the capture is fully
    /// consumed (which also moves a `Delivered` order to order-status `Refunded`), `PartiallyRefunded`
    /// otherwise.
    async fn record_refund(&self, order_id: i64, refund: NewRefund) -> Result<(Order, RefundRecord), OrderFlowError>;

    /// Marks the order as awaiting a refund retry after a gateway failure.
    async fn mark_refund_pending(&self, order_id: i64) -> Result<Order, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The cart for user {0} is empty")]
    EmptyCart(String),
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Insufficient stock for product {product_id} (requested {requested})")]
    InsufficientStock { product_id: i64, requested: i64 },
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order status may not change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Refunds must be issued through the refund workflow, not a status change")]
    RefundViaStatusChange,
    #[error(transparent)]
    Query(#[from] OrderQueryError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
