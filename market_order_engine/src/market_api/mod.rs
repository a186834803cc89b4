//! The public-facing APIs of the order engine.
//!
//! Each API is generic over a backend implementing the traits in [`crate::traits`], so the HTTP layer can
//! wire in the SQLite backend while tests substitute mocks.

mod order_flow_api;
mod payments_api;
mod reconciler;
mod refund_api;

pub use order_flow_api::OrderFlowApi;
pub use payments_api::{CheckoutItemRequest, PaymentApiError, PaymentsApi};
pub use reconciler::WebhookReconciler;
pub use refund_api::{RefundApi, RefundError};
