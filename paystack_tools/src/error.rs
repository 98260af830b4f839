use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaystackApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The request to Paystack timed out. The outcome is unknown.")]
    Timeout,
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Paystack rejected the request: {0}")]
    Unsuccessful(String),
    #[error("Could not compute signature: {0}")]
    SignatureError(String),
}

impl PaystackApiError {
    /// Network failures, timeouts and 5xx responses may succeed if tried again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RestRequestError(_) | Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PaystackApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else if e.is_request() || e.is_connect() {
            Self::RestRequestError(e.to_string())
        } else {
            Self::RestResponseError(e.to_string())
        }
    }
}
