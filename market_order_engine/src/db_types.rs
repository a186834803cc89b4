use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mos_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderNumber       -------------------------------------------------------
/// The customer-facing order reference, generated once at order creation and unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------     OrderStatus       -------------------------------------------------------
/// The fulfilment state of an order.
///
/// Transitions are closed: [`OrderStatus::can_transition_to`] is the single source of truth, and every
/// mutation path goes through it. `Cancelled` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Newly created; payment has not been confirmed.
    Pending,
    /// Payment confirmed; the order is being prepared.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Annulled before shipment. Reserved stock has been returned.
    Cancelled,
    /// Fully refunded after delivery.
    Refunded,
}

impl OrderStatus {
    /// The order transition table. Everything not listed here is invalid.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Cancelled)
                | (Processing, Shipped | Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    pub fn variants() -> [OrderStatus; 6] {
        use OrderStatus::*;
        [Pending, Processing, Shipped, Delivered, Cancelled, Refunded]
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// The state of the payment attached to an order.
///
/// A pending payment resolves exactly once (to `Completed`, `Failed` or `Expired`); the only move after
/// resolution is `Completed` → `Refunded` via the refund workflow. Gateway events that would move the status
/// backward are dropped as no-ops, which is what makes out-of-order webhook delivery safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    /// Monotone progression rank. Events may only increase it.
    pub fn rank(self) -> u8 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Expired => 1,
            PaymentStatus::Refunded => 2,
        }
    }

    pub fn can_advance_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Completed | Failed | Expired) | (Completed, Refunded))
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Expired => "Expired",
            PaymentStatus::Refunded => "Refunded",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Expired" => Ok(Self::Expired),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     RefundStatus      -------------------------------------------------------
/// Refund progress marker on an order. Absent until a refund is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RefundStatus {
    /// The gateway call failed; the refund is awaiting retry.
    RefundPending,
    PartiallyRefunded,
    Refunded,
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefundStatus::RefundPending => "RefundPending",
            RefundStatus::PartiallyRefunded => "PartiallyRefunded",
            RefundStatus::Refunded => "Refunded",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------       Product         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub seller_id: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
}

//--------------------------------------       CartLine        -------------------------------------------------------
/// One line of a user's cart. `unit_price` is the price snapshot taken when the line was added; order totals
/// are computed from it, not from the live product price.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

//--------------------------------------   ShippingAddress     -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

//--------------------------------------        Order          -------------------------------------------------------
/// The durable record of a purchase.
///
/// The monetary fields (`subtotal`, `tax`, `shipping`, `total`) are fixed at creation and never change;
/// `status` and `payment_status` move only through the state machine.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub notes: Option<String>,
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
    pub refund_status: Option<RefundStatus>,
    /// The amount the gateway reported as captured. The refund bound is computed against this.
    pub captured_amount: Option<Money>,
    pub captured_currency: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// The caller-supplied part of a new order. Everything else (totals, number, line items) is derived from the
/// cart snapshot inside the creation transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

//--------------------------------------      OrderItem        -------------------------------------------------------
/// A line within an order. Price-locked at purchase time: later product price changes never affect it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
}

//--------------------------------------    PaymentEvent       -------------------------------------------------------
/// The deduplication record for a gateway event. The existence of a row for an event id means the event has
/// been applied; replays are acknowledged without side effects.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentEvent {
    pub id: i64,
    pub event_id: String,
    pub order_id: Option<i64>,
    pub kind: String,
    pub applied_at: DateTime<Utc>,
}

//--------------------------------------    GatewayEvent       -------------------------------------------------------
/// A provider-agnostic view of a webhook event, after signature verification and payload parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    PaymentSucceeded,
    PaymentFailed,
    CheckoutCompleted,
    CheckoutExpired,
    /// Anything the engine does not act on. Acknowledged without side effects.
    Other(String),
}

impl Display for GatewayEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEventKind::PaymentSucceeded => write!(f, "payment_succeeded"),
            GatewayEventKind::PaymentFailed => write!(f, "payment_failed"),
            GatewayEventKind::CheckoutCompleted => write!(f, "checkout_completed"),
            GatewayEventKind::CheckoutExpired => write!(f, "checkout_expired"),
            GatewayEventKind::Other(kind) => write!(f, "other:{kind}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayEvent {
    /// The provider-assigned event id; the deduplication key.
    pub event_id: String,
    pub kind: GatewayEventKind,
    /// Resolved from the event's metadata. Events without one are logged and acknowledged.
    pub order_id: Option<i64>,
    pub amount: Option<Money>,
    pub currency: Option<String>,
    pub failure_reason: Option<String>,
}

/// What happened when a gateway event was fed into the engine.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The order was mutated; the updated order is returned.
    Applied(Order),
    /// An event with this id was applied before. Nothing was changed.
    AlreadyProcessed,
    /// The event was acknowledged but had no effect (unresolvable, unrecognized, or superseded).
    Ignored(String),
}

//--------------------------------------     RefundRecord      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RefundRecord {
    pub id: i64,
    pub order_id: i64,
    pub refund_id: String,
    pub amount: Money,
    pub reason: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A refund as reported back by the gateway, ready to be recorded against an order.
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub refund_id: String,
    pub amount: Money,
    pub reason: Option<String>,
    pub status: String,
}
