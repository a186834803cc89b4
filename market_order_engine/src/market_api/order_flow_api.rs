use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrderRequest, Order, OrderItem, OrderStatus},
    events::{EventProducers, OrderAnnulledEvent},
    helpers::PricingPolicy,
    traits::{OrderFlowDatabase, OrderFlowError},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: creating orders from carts, cancelling them,
/// and moving them through fulfilment.
pub struct OrderFlowApi<B> {
    db: B,
    pricing: PricingPolicy,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, pricing: PricingPolicy, producers: EventProducers) -> Self {
        Self { db, pricing, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderFlowDatabase
{
    /// Creates a durable order from the user's cart.
    ///
    /// The whole operation is one unit of work: stock is reserved with conditional atomic decrements, the
    /// order and its price-locked items are persisted as `Pending`/`Pending`, and the cart is cleared. If
    /// any product is short, the call fails with `InsufficientStock` naming the product and nothing is
    /// changed.
    pub async fn place_order(
        &self,
        user_id: &str,
        request: NewOrderRequest,
    ) -> Result<(Order, Vec<OrderItem>), OrderFlowError> {
        let (order, items) = self.db.create_order_from_cart(user_id, request, &self.pricing).await?;
        info!("🧾️ Order {} created for user {user_id} ({} items, {})", order.order_number, items.len(), order.total);
        Ok((order, items))
    }

    /// Cancels an order. Only `Pending` and `Processing` orders are cancellable; the reserved stock of every
    /// item is returned exactly once, inside the same unit of work as the status change.
    pub async fn cancel_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.transition_order(order_id, OrderStatus::Cancelled).await?;
        info!("🧾️ Order {} cancelled", order.order_number);
        self.call_order_annulled_hook(&order).await;
        Ok(order)
    }

    /// Moves an order along the fulfilment edges (`Processing` → `Shipped` → `Delivered`), or cancels it.
    ///
    /// Every edge is validated against the transition table; an invalid edge fails with `InvalidTransition`
    /// and leaves the order byte-for-byte unchanged. `Refunded` is not reachable through this call — money
    /// can only move through the refund workflow.
    pub async fn set_order_status(&self, order_id: i64, new_status: OrderStatus) -> Result<Order, OrderFlowError> {
        match new_status {
            OrderStatus::Refunded => Err(OrderFlowError::RefundViaStatusChange),
            OrderStatus::Cancelled => self.cancel_order(order_id).await,
            _ => self.db.transition_order(order_id, new_status).await,
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🧾️ Notifying order-annulled hook subscribers");
            let event = OrderAnnulledEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
