use serde::Serialize;

use crate::db_types::{Order, OrderStatus};

/// Emitted when a gateway event confirms payment and the order moves to `Processing`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order is cancelled and its stock has been returned.
#[derive(Debug, Clone, Serialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatus,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}
