//! Notification hand-off.
//!
//! Customer notifications (email, push) are delivered by an external service; the contract is a
//! fire-and-forget `notify(user, message)`. The hooks registered here run off the request path on the
//! engine's event channels, so a slow or dead notification service can never stall an order or a webhook
//! acknowledgement.

use futures::future::BoxFuture;
use log::*;
use market_order_engine::events::{EventHandlers, EventHooks};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

/// Builds the event handlers that forward order milestones to the notification service.
pub fn create_notification_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let order = ev.order;
        Box::pin(async move {
            notify(
                &order.user_id,
                &format!("Your order {} is confirmed and being prepared.", order.order_number),
            )
            .await;
        }) as BoxFuture<'static, ()>
    });
    hooks.on_order_annulled(move |ev| {
        let order = ev.order;
        Box::pin(async move {
            notify(&order.user_id, &format!("Your order {} has been cancelled.", order.order_number)).await;
        }) as BoxFuture<'static, ()>
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

/// The seam to the external notification service.
async fn notify(user_id: &str, message: &str) {
    info!("📣️ notify({user_id}): {message}");
}
