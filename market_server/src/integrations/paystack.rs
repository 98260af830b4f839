//! [`PaymentGateway`] backed by the Paystack REST API.
use log::*;
use market_engine::traits::{
    GatewayAuthorization,
    GatewayError,
    GatewayInitRequest,
    GatewayPaymentStatus,
    GatewayVerification,
    PaymentGateway,
};
use paystack_tools::{InitializeTransactionRequest, PaystackApi, PaystackApiError, PaystackConfig, TransactionDetails};

use crate::errors::ServerError;

#[derive(Clone)]
pub struct PaystackGateway {
    api: PaystackApi,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Result<Self, ServerError> {
        let api = PaystackApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }

    /// The secret that signs webhooks is the same key that authenticates API calls.
    pub fn config(&self) -> &PaystackConfig {
        self.api.config()
    }
}

impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, request: GatewayInitRequest) -> Result<GatewayAuthorization, GatewayError> {
        let request = InitializeTransactionRequest {
            email: request.email,
            amount: request.amount,
            currency: request.currency,
            reference: request.reference,
            callback_url: request.callback_url,
        };
        let result = self.api.initialize_transaction(request).await.map_err(gateway_error)?;
        Ok(GatewayAuthorization {
            authorization_url: result.authorization_url,
            access_code: Some(result.access_code).filter(|c| !c.is_empty()),
            reference: result.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        let details = self.api.verify_transaction(reference).await.map_err(gateway_error)?;
        Ok(verification_from(details))
    }
}

fn verification_from(details: TransactionDetails) -> GatewayVerification {
    let status = match details.status.as_str() {
        "success" => GatewayPaymentStatus::Success,
        "failed" | "reversed" => GatewayPaymentStatus::Failed,
        "abandoned" => GatewayPaymentStatus::Abandoned,
        other => {
            trace!("Paystack status '{other}' is treated as pending");
            GatewayPaymentStatus::Pending
        },
    };
    GatewayVerification {
        reference: details.reference,
        status,
        amount: details.amount,
        currency: details.currency,
        gateway_response: details.gateway_response,
    }
}

fn gateway_error(e: PaystackApiError) -> GatewayError {
    match e {
        PaystackApiError::Timeout => GatewayError::Timeout,
        PaystackApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        e if e.is_retryable() => GatewayError::Unavailable(e.to_string()),
        e => GatewayError::Rejected(e.to_string()),
    }
}
