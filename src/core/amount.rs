//! Fixed-point coin amounts.
//!
//! Amounts travel as decimal strings (`"12.5"`) and are held as `u64` minor
//! units with nine fractional digits, which is what the transaction encoding
//! carries.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::errors::WalletError;

/// Number of fractional digits in a coin amount.
pub const DECIMALS: u32 = 9;
const UNITS_PER_COIN: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u64) -> Self {
        Amount(units)
    }

    pub const fn units(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    fn from_decimal(value: Decimal) -> Result<Self, WalletError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(WalletError::InvalidAmount(format!("negative amount {}", value)));
        }
        let scaled = value
            .checked_mul(Decimal::from(UNITS_PER_COIN))
            .ok_or_else(|| WalletError::InvalidAmount(format!("amount {} out of range", value)))?;
        if !scaled.fract().is_zero() {
            return Err(WalletError::InvalidAmount(format!(
                "amount {} has more than {} decimal places",
                value, DECIMALS
            )));
        }
        scaled
            .to_u64()
            .map(Amount)
            .ok_or_else(|| WalletError::InvalidAmount(format!("amount {} out of range", value)))
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(WalletError::InvalidAmount("empty amount".to_string()));
        }
        let value = Decimal::from_str_exact(trimmed)
            .map_err(|e| WalletError::InvalidAmount(format!("{}: {}", trimmed, e)))?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = Decimal::from_i128_with_scale(i128::from(self.0), DECIMALS).normalize();
        write!(f, "{}", value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal coin amount")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Amount::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Amount::from_decimal(Decimal::from(v)).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
