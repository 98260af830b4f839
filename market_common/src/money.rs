use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "NGN";
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;
const DECIMAL_PLACES: u32 = 2;

//--------------------------------------        Money          ---------------------------------------------------------
/// A fixed-point amount of money, counted in minor units (kobo for NGN). Two fractional digits, always.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal amount in major units, e.g. `"33333.33"`. More than two fractional digits is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|e| MoneyConversionError(format!("'{s}' is not a number. {e}")))?;
        Self::try_from_decimal(value)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per_major, abs % per_major)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS_PER_MAJOR)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, rhs: Money) -> Result<Self, MoneyConversionError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| MoneyConversionError(format!("{self} + {rhs} is out of range")))
    }

    pub fn checked_sub(&self, rhs: Money) -> Result<Self, MoneyConversionError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| MoneyConversionError(format!("{self} - {rhs} is out of range")))
    }

    /// The price of `quantity` units at `self` each.
    pub fn checked_mul(&self, quantity: i64) -> Result<Self, MoneyConversionError> {
        self.0
            .checked_mul(quantity)
            .map(Self)
            .ok_or_else(|| MoneyConversionError(format!("{quantity} x {self} is out of range")))
    }

    pub fn checked_sum<I: IntoIterator<Item = Money>>(values: I) -> Result<Self, MoneyConversionError> {
        values.into_iter().try_fold(Self::default(), |total, m| total.checked_add(m))
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, DECIMAL_PLACES)
    }

    /// Converts an exact decimal amount in major units. Fails if the value has sub-minor-unit precision or does
    /// not fit.
    pub fn try_from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        if value.normalize().scale() > DECIMAL_PLACES {
            return Err(MoneyConversionError(format!("{value} has more than {DECIMAL_PLACES} decimal places")));
        }
        let minor = value * Decimal::from(MINOR_UNITS_PER_MAJOR);
        minor.to_i64().map(Self).ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))
    }

    /// Rounds a decimal amount in major units half away from zero to the nearest minor unit.
    pub fn round_from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        Self::try_from_decimal(value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Splits the amount into `parts` floor-rounded portions. The rounding remainder goes to the last portion, so the
    /// portions always sum to `self`. Returns `None` when `parts` is zero.
    pub fn split_evenly(&self, parts: u32) -> Option<Vec<Money>> {
        if parts == 0 {
            return None;
        }
        let n = i64::from(parts);
        let share = self.0.div_euclid(n);
        let remainder = self.0 - share * n;
        let mut result = vec![Money(share); parts as usize];
        if let Some(last) = result.last_mut() {
            last.0 += remainder;
        }
        Some(result)
    }
}
