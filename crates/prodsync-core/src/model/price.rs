//! Fixed-point currency amount
//!
//! Prices are stored as integer minor units (cents) so the sync policy's
//! percentage adjustment is exact and its rounding rule is explicit.
//! Serialized form is the decimal string (`"5.25"`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of minor units in one currency unit
const MINOR_UNITS: i64 = 100;

/// A price with exactly two fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(i64);

impl Price {
    /// Zero
    pub const ZERO: Price = Price(0);

    /// Create a price from minor units (`525` is `5.25`)
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a price from whole units and cents (`Price::new(5, 25)` is `5.25`)
    ///
    /// `cents` is expected to be below 100; larger values carry into units.
    pub const fn new(units: i64, cents: i64) -> Self {
        Self(units * MINOR_UNITS + cents)
    }

    /// Minor units
    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Increase by `percent` and round to two decimals, half away from zero
    ///
    /// `5.00` +5% is `5.25`; `0.10` +5% is `0.105` which rounds to `0.11`.
    pub fn increase_by_percent(self, percent: u32) -> Self {
        let scaled = i128::from(self.0) * (100 + i128::from(percent));
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            -((-scaled + 50) / 100)
        };
        Self(rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let minor = MINOR_UNITS as u64;
        write!(f, "{}{}.{:02}", sign, abs / minor, abs % minor)
    }
}

/// Error returned when a string is not a two-decimal amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid price '{0}': expected a decimal amount with at most two fractional digits")]
pub struct ParsePriceError(String);

impl FromStr for Price {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePriceError(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty()
            || frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let units: i64 = whole.parse().map_err(|_| err())?;
        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse().map_err(|_| err())?,
        };

        let magnitude = units
            .checked_mul(MINOR_UNITS)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(err)?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl TryFrom<String> for Price {
    type Error = ParsePriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}
