use std::time::Duration;

use log::*;
use market_common::Secret;

pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
pub const DEFAULT_PAYSTACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub callback_url: Option<String>,
    /// Upper bound on every call to the gateway. Elapsing it is reported as an unknown outcome.
    pub timeout: Duration,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PAYSTACK_BASE_URL.to_string(),
            secret_key: Secret::default(),
            callback_url: None,
            timeout: DEFAULT_PAYSTACK_TIMEOUT,
        }
    }
}

impl PaystackConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("MKT_PAYSTACK_BASE_URL").unwrap_or_else(|_| {
            info!("MKT_PAYSTACK_BASE_URL not set, using {DEFAULT_PAYSTACK_BASE_URL}");
            DEFAULT_PAYSTACK_BASE_URL.to_string()
        });
        let secret_key = Secret::new(std::env::var("MKT_PAYSTACK_SECRET_KEY").unwrap_or_else(|_| {
            warn!("MKT_PAYSTACK_SECRET_KEY not set, using (probably useless) default");
            "sk_test_0000000000000000".to_string()
        }));
        let callback_url = std::env::var("MKT_PAYSTACK_CALLBACK_URL").ok();
        if callback_url.is_none() {
            info!("MKT_PAYSTACK_CALLBACK_URL not set. Paystack will use the callback configured on the dashboard");
        }
        let timeout = std::env::var("MKT_PAYSTACK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid MKT_PAYSTACK_TIMEOUT_SECS value '{s}'. {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PAYSTACK_TIMEOUT);
        Self { base_url, secret_key, callback_url, timeout }
    }
}
