use thiserror::Error;

use crate::{
    db_types::{MoneyConversionError, OrderId},
    traits::{CatalogError, GatewayError, MarketplaceError, QueryError},
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Customer #{0} does not exist or is not active")]
    CustomerNotFound(i64),
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Product #{0} is not available")]
    ProductUnavailable(i64),
    #[error("A delivery address with coordinates is required")]
    MissingDeliveryAddress,
    #[error("The delivery coordinates are not valid")]
    InvalidLocation,
    #[error("The order total cannot be computed. {0}")]
    AmountOutOfRange(String),
    #[error("Could not build the installment schedule. {0}")]
    InvalidSchedule(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} is not awaiting payment")]
    OrderNotPayable(OrderId),
    #[error("{0}")]
    Forbidden(String),
    #[error("The payment gateway is unavailable. Please try again later. {0}")]
    GatewayUnavailable(String),
    #[error("The payment could not be initialized. {0}")]
    GatewayError(String),
    #[error("{0}")]
    MarketplaceError(#[from] MarketplaceError),
}

impl From<MoneyConversionError> for CheckoutError {
    fn from(e: MoneyConversionError) -> Self {
        Self::AmountOutOfRange(e.to_string())
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(e: CatalogError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<QueryError> for CheckoutError {
    fn from(e: QueryError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(e: GatewayError) -> Self {
        if e.is_retryable() {
            Self::GatewayUnavailable(e.to_string())
        } else {
            Self::GatewayError(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("'{0}' is not a valid payment reference")]
    InvalidReference(String),
    #[error("No payment with reference {0} exists")]
    NotFound(String),
    #[error("You are not allowed to verify this payment")]
    Forbidden,
    #[error("Payment verification failed. {0}")]
    Rejected(String),
    /// The outcome is unknown. Nothing was changed, and verification can be retried later.
    #[error("The payment gateway is unavailable. Please try again later. {0}")]
    GatewayUnavailable(String),
    #[error("The payment gateway returned an error. {0}")]
    GatewayError(String),
    #[error("{0}")]
    MarketplaceError(#[from] MarketplaceError),
}

impl From<QueryError> for VerificationError {
    fn from(e: QueryError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<GatewayError> for VerificationError {
    fn from(e: GatewayError) -> Self {
        if e.is_retryable() {
            Self::GatewayUnavailable(e.to_string())
        } else {
            Self::GatewayError(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RefundError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A reason for the refund is required")]
    MissingReason,
    #[error("{0}")]
    MarketplaceError(#[from] MarketplaceError),
}

impl From<QueryError> for RefundError {
    fn from(e: QueryError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
