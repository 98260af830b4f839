//! Delivery fee estimation.
//!
//! The fee is a straight-line (haversine) estimate from the dispatch origin to the customer's delivery location. No
//! geocoding happens here: the customer must already have coordinates on file, or supply them at checkout.
use market_common::{Money, MoneyConversionError};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() &&
            self.longitude.is_finite() &&
            (-90.0..=90.0).contains(&self.latitude) &&
            (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Error)]
pub enum DeliveryFeeError {
    #[error("No delivery location was provided")]
    MissingLocation,
    #[error("Invalid delivery coordinates ({0}, {1})")]
    InvalidCoordinates(f64, f64),
    #[error("The delivery location is {distance_km:.1}km away, which is beyond the {max_km:.1}km delivery range")]
    OutOfRange { distance_km: f64, max_km: f64 },
    #[error("Could not express the delivery fee in money. {0}")]
    Conversion(String),
}

impl From<MoneyConversionError> for DeliveryFeeError {
    fn from(e: MoneyConversionError) -> Self {
        Self::Conversion(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryFeeConfig {
    pub base_fee: Money,
    /// Charged per kilometre, on top of the base fee
    pub per_km_rate: Money,
    pub max_fee: Money,
    pub max_distance_km: f64,
    /// Where deliveries are dispatched from
    pub origin: GeoPoint,
    /// Orders with a subtotal at or below this amount ship for free
    pub free_delivery_threshold: Money,
}

impl Default for DeliveryFeeConfig {
    fn default() -> Self {
        Self {
            base_fee: Money::from_major(1_000),
            per_km_rate: Money::from_major(100),
            max_fee: Money::from_major(10_000),
            max_distance_km: 500.0,
            origin: GeoPoint::new(6.5244, 3.3792),
            free_delivery_threshold: Money::from_major(15_000),
        }
    }
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Estimates the delivery fee for an order with the given subtotal.
///
/// Orders at or below the free-delivery threshold are free, and the destination is not even looked at in that case.
/// Otherwise the fee is `base_fee + distance * per_km_rate`, capped at `max_fee`.
pub fn estimate_delivery_fee(
    config: &DeliveryFeeConfig,
    subtotal: Money,
    destination: Option<GeoPoint>,
) -> Result<Money, DeliveryFeeError> {
    if subtotal <= config.free_delivery_threshold {
        return Ok(Money::default());
    }
    let destination = destination.ok_or(DeliveryFeeError::MissingLocation)?;
    if !destination.is_valid() {
        return Err(DeliveryFeeError::InvalidCoordinates(destination.latitude, destination.longitude));
    }
    let distance_km = haversine_km(&config.origin, &destination);
    if distance_km > config.max_distance_km {
        return Err(DeliveryFeeError::OutOfRange { distance_km, max_km: config.max_distance_km });
    }
    let distance = Decimal::from_f64(distance_km)
        .ok_or_else(|| DeliveryFeeError::Conversion(format!("{distance_km} is not a valid distance")))?;
    let variable = Money::round_from_decimal(distance * config.per_km_rate.to_decimal())?;
    let fee = config.base_fee + variable;
    Ok(fee.min(config.max_fee))
}
