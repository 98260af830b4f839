use std::{fmt::Display, str::FromStr};

use market_common::{Money, MoneyConversionError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 10%
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

#[derive(Debug, Clone, Error)]
pub enum CommissionRateError {
    #[error("Commission rate must lie between 0 and 1. Got {0}")]
    OutOfRange(Decimal),
    #[error("Invalid commission rate. {0}")]
    InvalidFormat(String),
}

/// The platform's cut of every item subtotal, as a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct CommissionRate(Decimal);

impl Default for CommissionRate {
    fn default() -> Self {
        Self(DEFAULT_COMMISSION_RATE)
    }
}

impl TryFrom<Decimal> for CommissionRate {
    type Error = CommissionRateError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(CommissionRateError::OutOfRange(value));
        }
        Ok(Self(value))
    }
}

impl From<CommissionRate> for Decimal {
    fn from(value: CommissionRate) -> Self {
        value.0
    }
}

impl FromStr for CommissionRate {
    type Err = CommissionRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| CommissionRateError::InvalidFormat(e.to_string()))?;
        Self::try_from(value)
    }
}

impl Display for CommissionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub commission: Money,
    pub vendor_share: Money,
}

impl CommissionRate {
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Splits an item subtotal into the platform commission and the vendor's share. The commission is rounded half
    /// away from zero to the nearest minor unit and the vendor gets the rest, so the two always add up to `subtotal`.
    pub fn split(&self, subtotal: Money) -> Result<CommissionSplit, MoneyConversionError> {
        let commission = Money::round_from_decimal(subtotal.to_decimal() * self.0)?;
        Ok(CommissionSplit { commission, vendor_share: subtotal - commission })
    }
}
