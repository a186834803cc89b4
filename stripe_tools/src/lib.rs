//! A minimal, self-contained client for the Stripe REST API.
//!
//! Only the handful of endpoints the marketplace order server needs are implemented: payment intents, checkout
//! sessions, refunds, and webhook signature verification. The crate knows nothing about orders or inventory;
//! it speaks Stripe's wire format and nothing else.

mod api;
mod config;
pub mod data_objects;
mod error;
pub mod signature;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{CheckoutSession, Event, NewCheckoutSession, PaymentIntent, Refund, SessionLineItem};
pub use error::StripeApiError;
