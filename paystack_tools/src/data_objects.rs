use market_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every Paystack response is wrapped in this envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaystackResponse<T> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransactionRequest {
    pub email: String,
    /// Serialized in minor units (kobo), which is what Paystack expects.
    pub amount: Money,
    pub currency: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// The server-side view of a transaction, as returned by `GET /transaction/verify/{reference}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionDetails {
    pub status: String,
    pub reference: String,
    pub amount: Money,
    pub currency: String,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
}

impl TransactionDetails {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    pub const CHARGE_SUCCESS: &'static str = "charge.success";

    pub fn is_charge_success(&self) -> bool {
        self.event == Self::CHARGE_SUCCESS
    }

    pub fn reference(&self) -> Option<&str> {
        self.data["reference"].as_str()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_verify_response() {
        let json = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "id": 4099260516,
                "domain": "test",
                "status": "success",
                "reference": "PAY-0f4c6a0e2d3b4b8f9a1c2d3e4f5a6b7c",
                "amount": 2100000,
                "gateway_response": "Successful",
                "paid_at": "2024-08-22T09:15:02.000Z",
                "currency": "NGN",
                "channel": "card"
            }
        }"#;
        let response: PaystackResponse<TransactionDetails> = serde_json::from_str(json).unwrap();
        assert!(response.status);
        let data = response.data.unwrap();
        assert!(data.is_success());
        assert_eq!(data.amount, Money::from(2_100_000));
        assert_eq!(data.currency, "NGN");
        assert_eq!(data.paid_at.as_deref(), Some("2024-08-22T09:15:02.000Z"));
    }

    #[test]
    fn serialize_initialize_request() {
        let req = InitializeTransactionRequest {
            email: "ada@example.com".into(),
            amount: Money::from_major(21_000),
            currency: "NGN".into(),
            reference: "PAY-1".into(),
            callback_url: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["amount"], 2_100_000);
        assert!(json.get("callback_url").is_none());
    }

    #[test]
    fn webhook_event_reference() {
        let json = r#"{"event":"charge.success","data":{"reference":"abc-installment-1","amount":100}}"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_charge_success());
        assert_eq!(event.reference(), Some("abc-installment-1"));
        let event: WebhookEvent = serde_json::from_str(r#"{"event":"transfer.success"}"#).unwrap();
        assert!(!event.is_charge_success());
        assert_eq!(event.reference(), None);
    }
}
