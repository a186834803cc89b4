use thiserror::Error;

use crate::db_types::{CartLine, Order, OrderItem, OrderNumber, PaymentEvent, Product, RefundRecord};

/// Read-only access to orders, carts, products and refunds.
///
/// Everything here is side-effect free; the mutating flows live on
/// [`super::OrderFlowDatabase`].
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderQueryError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderQueryError>;

    /// Looks up the order correlated with a gateway payment intent.
    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, OrderQueryError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderQueryError>;

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderQueryError>;

    /// True when at least one item in the order is sold by the given seller. Used for read authorization.
    async fn order_contains_seller(&self, order_id: i64, seller_id: &str) -> Result<bool, OrderQueryError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, OrderQueryError>;

    async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartLine>, OrderQueryError>;

    async fn fetch_refunds_for_order(&self, order_id: i64) -> Result<Vec<RefundRecord>, OrderQueryError>;

    /// Looks up the dedup record for a gateway event id, if the event has been applied.
    async fn fetch_payment_event(&self, event_id: &str) -> Result<Option<PaymentEvent>, OrderQueryError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderQueryError {
    fn from(e: sqlx::Error) -> Self {
        OrderQueryError::DatabaseError(e.to_string())
    }
}
