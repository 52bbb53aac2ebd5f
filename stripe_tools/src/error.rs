use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StripeApiError {
    #[error("Could not initialize the Stripe API client. {0}")]
    Initialization(String),
    #[error("Error sending request to Stripe. {0}")]
    RequestError(String),
    #[error("Could not deserialize Stripe response. {0}")]
    JsonError(String),
    #[error("Stripe returned an error response. Code {status}: {message}")]
    QueryError { status: u16, message: String },
}

impl StripeApiError {
    /// True when Stripe answered 404 for the requested object (e.g. an unknown payment intent id).
    pub fn is_not_found(&self) -> bool {
        matches!(self, StripeApiError::QueryError { status: 404, .. })
    }
}
