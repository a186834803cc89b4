//! # Marketplace order server
//!
//! The HTTP layer over the [`market_order_engine`]. It is responsible for:
//! * authenticating callers via the identity headers set by the upstream auth proxy,
//! * exposing the order lifecycle endpoints (create, read, cancel, status changes),
//! * exposing the payment endpoints (intent, checkout session, refund, config),
//! * receiving and signature-verifying payment-gateway webhooks and feeding them to the reconciler.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for details.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod payment_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
