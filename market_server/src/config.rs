use std::{env, fmt::Display, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use market_common::{helpers::env_flag, Money, Secret, DEFAULT_CURRENCY_CODE};
use market_engine::{
    events::RetryPolicy,
    helpers::{CommissionRate, DeliveryFeeConfig, GeoPoint},
    CheckoutConfig,
    SettlementConfig,
};
use paystack_tools::PaystackConfig;

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/marketplace.db";
const DEFAULT_OVERDUE_DELIVERY_DAYS: i64 = 30;
const DEFAULT_OVERDUE_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const DEFAULT_NOTIFICATION_BUFFER: usize = 100;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Key for the HMAC that the upstream authenticator attaches to every identity assertion.
    pub identity_secret: Secret<String>,
    pub checkout: CheckoutConfig,
    pub settlement: SettlementConfig,
    pub paystack: PaystackConfig,
    pub notification_policy: RetryPolicy,
    pub notification_buffer: usize,
    /// Shipped orders older than this are flagged as overdue.
    pub overdue_delivery_age: Duration,
    pub overdue_check_interval: StdDuration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            identity_secret: Secret::default(),
            checkout: CheckoutConfig::default(),
            settlement: SettlementConfig::default(),
            paystack: PaystackConfig::default(),
            notification_policy: RetryPolicy::default(),
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
            overdue_delivery_age: Duration::days(DEFAULT_OVERDUE_DELIVERY_DAYS),
            overdue_check_interval: DEFAULT_OVERDUE_CHECK_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = parse_env("MKT_PORT", DEFAULT_MKT_PORT);
        let database_url = env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MKT_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let identity_secret = env::var("MKT_IDENTITY_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ MKT_IDENTITY_SECRET is not set. No identity assertion will be accepted until it is configured."
            );
            String::default()
        });
        let checkout = checkout_config_from_env();
        let settlement = SettlementConfig::new(parse_env("MKT_COMMISSION_RATE", CommissionRate::default()));
        let paystack = PaystackConfig::new_from_env_or_default();
        let notification_policy = RetryPolicy::new(
            parse_env("MKT_NOTIFICATION_MAX_ATTEMPTS", defaults.notification_policy.max_attempts),
            StdDuration::from_millis(parse_env(
                "MKT_NOTIFICATION_INITIAL_BACKOFF_MS",
                defaults.notification_policy.initial_backoff.as_millis() as u64,
            )),
        );
        let notification_buffer = parse_env("MKT_NOTIFICATION_BUFFER", DEFAULT_NOTIFICATION_BUFFER);
        let overdue_days = parse_env("MKT_OVERDUE_DELIVERY_DAYS", DEFAULT_OVERDUE_DELIVERY_DAYS);
        let overdue_delivery_age = Duration::days(overdue_days);
        let overdue_check_interval = StdDuration::from_secs(parse_env(
            "MKT_OVERDUE_CHECK_INTERVAL_SECS",
            DEFAULT_OVERDUE_CHECK_INTERVAL.as_secs(),
        ));
        Self {
            host,
            port,
            database_url,
            identity_secret: Secret::new(identity_secret),
            checkout,
            settlement,
            paystack,
            notification_policy,
            notification_buffer,
            overdue_delivery_age,
            overdue_check_interval,
        }
    }
}

fn checkout_config_from_env() -> CheckoutConfig {
    let defaults = DeliveryFeeConfig::default();
    let currency = env::var("MKT_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
    let enforce_delivery_address = env_flag("MKT_ENFORCE_DELIVERY_ADDRESS", true);
    if !enforce_delivery_address {
        warn!("🪛️ Delivery addresses are not enforced. Orders without coordinates ship for the base fee only.");
    }
    let origin = GeoPoint::new(
        parse_env("MKT_DELIVERY_ORIGIN_LAT", defaults.origin.latitude),
        parse_env("MKT_DELIVERY_ORIGIN_LNG", defaults.origin.longitude),
    );
    let delivery = DeliveryFeeConfig {
        base_fee: parse_env("MKT_DELIVERY_BASE_FEE", defaults.base_fee),
        per_km_rate: parse_env("MKT_DELIVERY_PER_KM_RATE", defaults.per_km_rate),
        max_fee: parse_env("MKT_DELIVERY_MAX_FEE", defaults.max_fee),
        max_distance_km: parse_env("MKT_DELIVERY_MAX_DISTANCE_KM", defaults.max_distance_km),
        origin,
        free_delivery_threshold: parse_env::<Money>("MKT_FREE_DELIVERY_THRESHOLD", defaults.free_delivery_threshold),
    };
    let callback_url = env::var("MKT_PAYSTACK_CALLBACK_URL").ok();
    CheckoutConfig { currency, enforce_delivery_address, callback_url, delivery }
}

/// Reads and parses `name`, falling back to `default` (with a log line) when it is missing or malformed.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_env_falls_back_on_garbage() {
        env::set_var("MKT_TEST_PARSE_ENV_PORT", "not-a-port");
        assert_eq!(parse_env("MKT_TEST_PARSE_ENV_PORT", 8080u16), 8080);
        env::set_var("MKT_TEST_PARSE_ENV_PORT", " 9000 ");
        assert_eq!(parse_env("MKT_TEST_PARSE_ENV_PORT", 8080u16), 9000);
        assert_eq!(parse_env("MKT_TEST_PARSE_ENV_UNSET", 5u32), 5);
    }

    #[test]
    fn money_values_are_read_in_major_units() {
        env::set_var("MKT_TEST_PARSE_ENV_FEE", "2500.50");
        assert_eq!(parse_env("MKT_TEST_PARSE_ENV_FEE", Money::default()), Money::from(250_050));
    }

    #[test]
    fn commission_rate_is_validated() {
        env::set_var("MKT_TEST_PARSE_ENV_RATE", "1.5");
        assert_eq!(parse_env("MKT_TEST_PARSE_ENV_RATE", CommissionRate::default()), CommissionRate::default());
        env::set_var("MKT_TEST_PARSE_ENV_RATE", "0.25");
        assert_eq!(parse_env("MKT_TEST_PARSE_ENV_RATE", CommissionRate::default()).to_string(), "0.25");
    }
}
