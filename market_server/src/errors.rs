use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use market_engine::{
    CatalogError,
    CheckoutError,
    LedgerError,
    MarketplaceError,
    QueryError,
    RefundError,
    VerificationError,
};
use thiserror::Error;

/// Shown to the caller in place of the details of internal failures, which only go to the log.
const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    GatewayUnavailable(String),
    #[error("{0}")]
    GatewayError(String),
}

impl ServerError {
    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!("💻️ {self}");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "error": message }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No identity was supplied with the request.")]
    MissingIdentity,
    #[error("The identity assertion is not in the correct format. {0}")]
    PoorlyFormattedIdentity(String),
    #[error("The identity signature is invalid.")]
    InvalidSignature,
}

impl From<MarketplaceError> for ServerError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::DatabaseError(_) | MarketplaceError::CatalogError(_) => {
                Self::BackendError(e.to_string())
            },
            MarketplaceError::OrderNotFound(_) |
            MarketplaceError::PaymentNotFound(_) |
            MarketplaceError::RefundNotFound(_) => Self::NoRecordFound(e.to_string()),
            MarketplaceError::Forbidden(s) => Self::InsufficientPermissions(s),
            MarketplaceError::LedgerError(e) => e.into(),
            MarketplaceError::QueryError(e) => e.into(),
            MarketplaceError::EmptyOrder |
            MarketplaceError::InvalidOrderTotal(_) |
            MarketplaceError::AmountOutOfRange(_) |
            MarketplaceError::OrderNotPayable(_) |
            MarketplaceError::InvalidTransition { .. } |
            MarketplaceError::OrderNotDelivered(_) |
            MarketplaceError::InvalidDeliveryAgent(_) |
            MarketplaceError::RefundAlreadyProcessed(_) |
            MarketplaceError::RefundAlreadyExists(_) |
            MarketplaceError::NoRefundablePayment(_) |
            MarketplaceError::RefundExceedsPayment { .. } |
            MarketplaceError::InvalidAmount(_) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DatabaseError(_) => Self::BackendError(e.to_string()),
            LedgerError::InvalidAmount(_) | LedgerError::InsufficientFunds { .. } => {
                Self::ValidationError(e.to_string())
            },
        }
    }
}

impl From<QueryError> for ServerError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::DatabaseError(_) => Self::BackendError(e.to_string()),
            QueryError::QueryError(s) => Self::ValidationError(s),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::DatabaseError(_) => Self::BackendError(e.to_string()),
            CheckoutError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::Forbidden(s) => Self::InsufficientPermissions(s),
            CheckoutError::GatewayUnavailable(_) => Self::GatewayUnavailable(e.to_string()),
            CheckoutError::GatewayError(_) => Self::GatewayError(e.to_string()),
            CheckoutError::MarketplaceError(e) => e.into(),
            CheckoutError::CustomerNotFound(_) |
            CheckoutError::EmptyCart |
            CheckoutError::ProductUnavailable(_) |
            CheckoutError::MissingDeliveryAddress |
            CheckoutError::InvalidLocation |
            CheckoutError::InvalidSchedule(_) |
            CheckoutError::AmountOutOfRange(_) |
            CheckoutError::OrderNotPayable(_) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<VerificationError> for ServerError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::DatabaseError(_) => Self::BackendError(e.to_string()),
            VerificationError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            VerificationError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            VerificationError::InvalidReference(_) | VerificationError::Rejected(_) => {
                Self::ValidationError(e.to_string())
            },
            VerificationError::GatewayUnavailable(_) => Self::GatewayUnavailable(e.to_string()),
            VerificationError::GatewayError(_) => Self::GatewayError(e.to_string()),
            VerificationError::MarketplaceError(e) => e.into(),
        }
    }
}

impl From<RefundError> for ServerError {
    fn from(e: RefundError) -> Self {
        match e {
            RefundError::DatabaseError(_) => Self::BackendError(e.to_string()),
            RefundError::MissingReason => Self::ValidationError(e.to_string()),
            RefundError::MarketplaceError(e) => e.into(),
        }
    }
}
