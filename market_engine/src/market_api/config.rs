use market_common::DEFAULT_CURRENCY_CODE;
use serde::{Deserialize, Serialize};

use crate::helpers::{CommissionRate, DeliveryFeeConfig};

/// Checkout settings. These are passed into [`crate::CheckoutApi`] when it is constructed and are never read from
/// the environment at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub currency: String,
    /// When true, checkout fails unless the customer supplies (or has on file) delivery coordinates.
    pub enforce_delivery_address: bool,
    /// Passed to the payment gateway on initialization. The gateway's default is used when absent.
    pub callback_url: Option<String>,
    pub delivery: DeliveryFeeConfig,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            enforce_delivery_address: true,
            callback_url: None,
            delivery: DeliveryFeeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub commission_rate: CommissionRate,
}

impl SettlementConfig {
    pub fn new(commission_rate: CommissionRate) -> Self {
        Self { commission_rate }
    }
}
