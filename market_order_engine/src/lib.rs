//! Marketplace Order Engine
//!
//! This library contains the core order lifecycle and payment reconciliation logic for the marketplace
//! backend. It turns a shopping cart into a durable order, reserves inventory, correlates orders with
//! payment-gateway objects, and reconciles asynchronous gateway events back into order state. It is
//! provider-agnostic: the payment processor is abstracted behind a trait.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@sqlite`], behind the default `sqlite` feature). All access goes through the traits in
//!    [`mod@traits`]; the SQLite backend implements them over a connection pool with the money- and
//!    stock-moving operations executed as single transactions.
//! 2. The public APIs ([`OrderFlowApi`], [`WebhookReconciler`], [`PaymentsApi`], [`RefundApi`]). These
//!    orchestrate the storage traits and the payment processor and own the order state machine's side
//!    effects.
//! 3. Event hooks ([`mod@events`]): a small actor-style pub-sub used to hand completed-order and
//!    cancelled-order notifications to downstream consumers (the notification service) without blocking the
//!    request path.

pub mod db_types;
pub mod events;
pub mod helpers;
mod market_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use market_api::{
    CheckoutItemRequest,
    OrderFlowApi,
    PaymentApiError,
    PaymentsApi,
    RefundApi,
    RefundError,
    WebhookReconciler,
};
