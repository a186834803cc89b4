use mos_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of a Stripe payment intent that the order server cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// A hosted checkout session. `url` is where the customer completes payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A single line on a new checkout session. Stripe wants the display name and unit amount inline, so callers
/// supply current product data rather than ids.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount: Money,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub currency: String,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Copied verbatim onto the session's metadata map.
    pub metadata: Vec<(String, String)>,
}

/// An event as delivered to the webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl Event {
    /// The object the event describes (a payment intent, a checkout session, ...).
    pub fn object(&self) -> &Value {
        &self.data.object
    }

    /// Fetch a metadata value from the event's object, if present.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.data.object.get("metadata").and_then(|m| m.get(key)).and_then(Value::as_str)
    }
}
