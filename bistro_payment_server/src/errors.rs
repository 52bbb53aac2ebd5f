use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bistro_order_engine::traits::OrderLedgerError;
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Auth token signature invalid or not provided")]
    CouldNotDeserializeAuthToken,
    #[error("Authentication is required for online payments")]
    AuthenticationRequired,
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Payment has not been completed. The payment intent status is {0}")]
    PaymentNotCompleted(String),
    #[error("Payment amount does not match order total")]
    AmountMismatch,
    #[error("{0}")]
    Conflict(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::PaymentNotCompleted(_) => StatusCode::BAD_REQUEST,
            Self::AmountMismatch => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializeAuthToken => StatusCode::UNAUTHORIZED,
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AuthenticationError(e) => match e {
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid or expired. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<OrderLedgerError> for ServerError {
    fn from(e: OrderLedgerError) -> Self {
        match e {
            OrderLedgerError::ItemNotFound(_)
            | OrderLedgerError::ItemUnavailable(_)
            | OrderLedgerError::EmptyOrder
            | OrderLedgerError::InvalidQuantity
            | OrderLedgerError::OrderModificationNoOp
            | OrderLedgerError::InvalidStatusTransition { .. } => Self::ValidationError(e.to_string()),
            OrderLedgerError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            OrderLedgerError::PaymentAlreadyCompleted(_) => {
                Self::Conflict("Payment has already been completed".to_string())
            },
            OrderLedgerError::NotACashOrder(_) => Self::Conflict(e.to_string()),
            OrderLedgerError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match &e {
            GatewayError::UnknownIntent(id) => Self::NoRecordFound(format!("Payment intent {id}")),
            GatewayError::Api(api_err) if api_err.is_not_found() => {
                Self::NoRecordFound("Payment intent".to_string())
            },
            GatewayError::Api(_) => Self::BackendError(e.to_string()),
        }
    }
}
