use std::{fmt::Display, str::FromStr};

use market_engine::{
    db_types::{InstallmentDuration, Money, Order, OrderId, OrderStatusType, Refund, RefundDecision, WalletTransaction},
    market_api::order_objects::CheckoutRequest,
    traits::{
        CommissionReversal,
        CommissionReversalFailure,
        RefundOutcome,
        SettlementOutcome,
        VendorCredit,
        VendorCreditFailure,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServerError;

/// The envelope around every successful JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> JsonResponse<T> {
    pub fn success<S: Display>(message: S, data: T) -> Self {
        Self { success: true, message: message.to_string(), data: Some(data) }
    }
}

impl JsonResponse<()> {
    pub fn message<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string(), data: None }
    }
}

//--------------------------------------       Checkout        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentCheckoutParams {
    #[serde(flatten)]
    pub location: CheckoutRequest,
    pub duration: String,
}

impl InstallmentCheckoutParams {
    pub fn duration(&self) -> Result<InstallmentDuration, ServerError> {
        InstallmentDuration::from_str(self.duration.trim()).map_err(|_| {
            ServerError::ValidationError(format!(
                "'{}' is not a valid duration. Use one of 1_month, 3_months, 6_months or 1_year",
                self.duration
            ))
        })
    }
}

//--------------------------------------     Verification      ---------------------------------------------------------
/// Paystack appends `trxref` (and `reference`) to the callback URL. Either is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPaymentParams {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

impl VerifyPaymentParams {
    pub fn reference(&self) -> Result<&str, ServerError> {
        self.reference
            .as_deref()
            .or(self.trxref.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ServerError::ValidationError("A payment reference is required".into()))
    }
}

//--------------------------------------      Order flow       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: String,
    pub reason: Option<String>,
}

impl StatusUpdateParams {
    pub fn status(&self) -> Result<OrderStatusType, ServerError> {
        OrderStatusType::from_str(&self.status.trim().to_uppercase())
            .map_err(|_| ServerError::ValidationError(format!("'{}' is not a valid order status", self.status)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignAgentParams {
    pub agent_id: i64,
}

/// What happened to each vendor when an order was settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub already_settled: bool,
    pub refunded: bool,
    pub credited: Vec<VendorCredit>,
    pub failed: Vec<VendorCreditFailure>,
}

impl From<SettlementOutcome> for SettlementReport {
    fn from(outcome: SettlementOutcome) -> Self {
        let already_settled = outcome.already_settled;
        let refunded = outcome.refunded;
        let mut credited = Vec::new();
        let mut failed = Vec::new();
        for result in outcome.credits.results {
            match result {
                Ok(credit) => credited.push(credit),
                Err(failure) => failed.push(failure),
            }
        }
        Self { already_settled, refunded, credited, failed }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResult {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementReport>,
}

//--------------------------------------        Refunds        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequestParams {
    pub order_id: OrderId,
    pub reason: String,
    /// Major units, as a string or a number. Defaults to the whole payment.
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRefundParams {
    pub action: String,
    #[serde(alias = "rejection_reason")]
    pub reason: Option<String>,
}

impl ProcessRefundParams {
    pub fn decision(&self) -> Result<RefundDecision, ServerError> {
        match self.action.trim().to_lowercase().as_str() {
            "approve" => Ok(RefundDecision::Approve),
            "reject" => Ok(RefundDecision::Reject { reason: self.reason.clone() }),
            other => {
                Err(ServerError::ValidationError(format!("Unknown refund action '{other}'. Use approve or reject")))
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReport {
    pub refund: Refund,
    pub order: Order,
    pub customer_credit: Option<WalletTransaction>,
    pub reversed: Vec<CommissionReversal>,
    pub failed_reversals: Vec<CommissionReversalFailure>,
}

impl From<RefundOutcome> for RefundReport {
    fn from(outcome: RefundOutcome) -> Self {
        let mut reversed = Vec::new();
        let mut failed_reversals = Vec::new();
        for result in outcome.reversals.results {
            match result {
                Ok(r) => reversed.push(r),
                Err(f) => failed_reversals.push(f),
            }
        }
        Self {
            refund: outcome.refund,
            order: outcome.order,
            customer_credit: outcome.customer_credit,
            reversed,
            failed_reversals,
        }
    }
}

//--------------------------------------        Wallets        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalParams {
    /// Major units, as a string or a number
    pub amount: Value,
}

/// Reads an amount in major units from a JSON string or number, e.g. `"5000.00"` or `5000`.
pub fn parse_amount(value: &Value) -> Result<Money, ServerError> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(ServerError::ValidationError("The amount must be a number".into())),
    };
    Money::from_str(&text).map_err(|e| ServerError::ValidationError(e.to_string()))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn amounts_from_strings_and_numbers() {
        assert_eq!(parse_amount(&json!("5000.50")).unwrap(), Money::from(500_050));
        assert_eq!(parse_amount(&json!(5000)).unwrap(), Money::from_major(5000));
        assert_eq!(parse_amount(&json!(12.5)).unwrap(), Money::from(1250));
        assert!(parse_amount(&json!("1.005")).is_err());
        assert!(parse_amount(&json!(null)).is_err());
        assert!(parse_amount(&json!("lots")).is_err());
    }

    #[test]
    fn refund_actions() {
        let params = |action: &str| ProcessRefundParams { action: action.into(), reason: Some("Damaged".into()) };
        assert_eq!(params("APPROVE").decision().unwrap(), RefundDecision::Approve);
        assert_eq!(
            params("reject").decision().unwrap(),
            RefundDecision::Reject { reason: Some("Damaged".into()) }
        );
        assert!(params("maybe").decision().is_err());
    }

    #[test]
    fn verify_params_accept_trxref() {
        let params: VerifyPaymentParams = serde_json::from_value(json!({ "trxref": "PAY-1" })).unwrap();
        assert_eq!(params.reference().unwrap(), "PAY-1");
        let params: VerifyPaymentParams =
            serde_json::from_value(json!({ "reference": "PAY-2", "trxref": "PAY-1" })).unwrap();
        assert_eq!(params.reference().unwrap(), "PAY-2");
        assert!(VerifyPaymentParams::default().reference().is_err());
    }

    #[test]
    fn installment_durations() {
        let params: InstallmentCheckoutParams =
            serde_json::from_value(json!({ "duration": "3_months", "latitude": 6.5, "longitude": 3.4 })).unwrap();
        assert_eq!(params.duration().unwrap(), InstallmentDuration::ThreeMonths);
        assert_eq!(params.location.latitude, Some(6.5));
        let params: InstallmentCheckoutParams = serde_json::from_value(json!({ "duration": "2_weeks" })).unwrap();
        assert!(params.duration().is_err());
    }

    #[test]
    fn status_params_ignore_case() {
        let params = StatusUpdateParams { status: "delivered".into(), reason: None };
        assert_eq!(params.status().unwrap(), OrderStatusType::Delivered);
        let params = StatusUpdateParams { status: "LOST".into(), reason: None };
        assert!(params.status().is_err());
    }
}
