use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{GatewayEvent, GatewayEventKind, PaymentStatus, WebhookOutcome},
    events::{EventProducers, OrderPaidEvent},
    traits::{OrderFlowDatabase, OrderFlowError},
};

/// `WebhookReconciler` feeds verified payment-gateway events into the order state machine.
///
/// The caller is responsible for authenticating the delivery (signature verification on the raw body) and
/// parsing it into a [`GatewayEvent`]. From there the reconciler guarantees:
/// * **idempotence** — the dedup record and the order mutation are written in one unit of work, so applying
///   the same provider event id twice has the same observable effect as applying it once;
/// * **out-of-order safety** — events that would move the payment status backward are acknowledged as no-ops
///   rather than errors;
/// * **no retry storms** — events that cannot be resolved to an order are logged and acknowledged, never
///   bounced back to the provider. Only genuine storage failures propagate, so the provider retries exactly
///   the deliveries that have a chance of succeeding later.
pub struct WebhookReconciler<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for WebhookReconciler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookReconciler")
    }
}

impl<B> WebhookReconciler<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> WebhookReconciler<B>
where B: OrderFlowDatabase
{
    pub async fn process_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, OrderFlowError> {
        if let GatewayEventKind::Other(kind) = &event.kind {
            debug!("🔔️ Ignoring event {} with unrecognized kind {kind}", event.event_id);
            return Ok(WebhookOutcome::Ignored(format!("unrecognized event kind {kind}")));
        }
        if event.order_id.is_none() {
            warn!("🔔️ Event {} ({}) has no resolvable order id. Acknowledging without effect.", event.event_id, event.kind);
            return Ok(WebhookOutcome::Ignored("the event carries no order correlation id".to_string()));
        }
        let kind = event.kind.clone();
        let event_id = event.event_id.clone();
        let outcome = self.db.apply_payment_event(event).await?;
        match &outcome {
            WebhookOutcome::Applied(order) => {
                info!("🔔️ Event {event_id} ({kind}) applied to order {}. Payment is now {}", order.order_number, order.payment_status);
                if order.payment_status == PaymentStatus::Completed {
                    self.call_order_paid_hook(order).await;
                }
            },
            WebhookOutcome::AlreadyProcessed => {
                debug!("🔔️ Event {event_id} is a replay; no effect");
            },
            WebhookOutcome::Ignored(reason) => {
                info!("🔔️ Event {event_id} ({kind}) acknowledged without effect: {reason}");
            },
        }
        Ok(outcome)
    }

    async fn call_order_paid_hook(&self, order: &crate::db_types::Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔔️ Notifying order-paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
