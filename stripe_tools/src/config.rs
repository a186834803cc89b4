use std::time::Duration;

use mos_common::Secret;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Stripe API.
///
/// The `api_base` is overridable so that tests (and the stripe-mock container) can point the client at a local
/// server.
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: Secret<String>,
    pub publishable_key: String,
    pub webhook_secret: Secret<String>,
    /// Every outbound call is bounded by this timeout. A timed-out call surfaces as a transport error.
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key: Secret::default(),
            publishable_key: String::default(),
            webhook_secret: Secret::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl StripeConfig {
    pub fn new(secret_key: Secret<String>, publishable_key: String, webhook_secret: Secret<String>) -> Self {
        Self { secret_key, publishable_key, webhook_secret, ..Default::default() }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
