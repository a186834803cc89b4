use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StripeApiError {
    #[error("Could not initialize the Stripe client. {0}")]
    Initialization(String),
    #[error("Error sending request to Stripe. {0}")]
    RestResponseError(String),
    #[error("Could not deserialize Stripe response. {0}")]
    JsonError(String),
    #[error("Stripe returned an error response ({status}): {message}")]
    QueryError { status: u16, message: String },
}
