use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use market_order_engine::{
    traits::{OrderFlowError, OrderQueryError, ProcessorError},
    PaymentApiError,
    RefundError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Insufficient permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Invalid webhook signature")]
    WebhookAuthError,
    #[error("Payments are not enabled on this server")]
    GatewayUnavailable,
    #[error("The payment gateway could not process the request. {0}")]
    GatewayError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            // Never 5xx: the provider would retry a permanently broken delivery forever.
            Self::WebhookAuthError => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(msg) => Self::BackendError(msg),
            OrderFlowError::Query(q) => q.into(),
            OrderFlowError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            e @ (OrderFlowError::EmptyCart(_)
            | OrderFlowError::ProductUnavailable(_)
            | OrderFlowError::InsufficientStock { .. }
            | OrderFlowError::InvalidTransition { .. }
            | OrderFlowError::RefundViaStatusChange) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<OrderQueryError> for ServerError {
    fn from(e: OrderQueryError) -> Self {
        // never echo database internals to the client
        Self::BackendError(e.to_string())
    }
}

impl From<ProcessorError> for ServerError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::NotConfigured => Self::GatewayUnavailable,
            e => Self::GatewayError(e.to_string()),
        }
    }
}

impl From<PaymentApiError> for ServerError {
    fn from(e: PaymentApiError) -> Self {
        match e {
            PaymentApiError::Flow(e) => e.into(),
            PaymentApiError::Gateway(e) => e.into(),
            PaymentApiError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            PaymentApiError::NotPayable(msg) => Self::ValidationError(msg),
        }
    }
}

impl From<RefundError> for ServerError {
    fn from(e: RefundError) -> Self {
        match e {
            RefundError::Flow(e) => e.into(),
            RefundError::Gateway(e) => e.into(),
            RefundError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            e @ (RefundError::NotRefundable(_) | RefundError::ExceedsCaptured { .. }) => {
                Self::ValidationError(e.to_string())
            },
        }
    }
}
