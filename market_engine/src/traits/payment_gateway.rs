use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::Money;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The outcome is unknown. The charge may well have gone through on the gateway's side.
    #[error("The payment gateway did not respond in time")]
    Timeout,
    #[error("The payment gateway is unavailable. {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("The payment gateway sent an invalid response. {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInitRequest {
    pub email: String,
    pub amount: Money,
    pub currency: String,
    pub reference: String,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAuthorization {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayVerification {
    pub reference: String,
    pub status: GatewayPaymentStatus,
    /// In minor units, exactly as reported by the gateway
    pub amount: Money,
    pub currency: String,
    pub gateway_response: Option<String>,
}

/// An external payment processor. Its answers are untrusted: callers must check status, currency and amount before
/// acting on a verification.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    async fn initialize(&self, request: GatewayInitRequest) -> Result<GatewayAuthorization, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError>;
}
