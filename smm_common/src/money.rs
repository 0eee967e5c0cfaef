use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of micro-units in one whole currency unit.
pub const MICROS_PER_UNIT: i64 = 1_000_000;
const FRACTION_DIGITS: usize = 6;

//--------------------------------------        Money        ---------------------------------------------------------
/// A fixed-point monetary amount, stored as an integer number of micro-units (10^-6 of the currency unit).
///
/// All wallet arithmetic happens on this type. It never passes through floating point, so summing many small order
/// prices cannot drift.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
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

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(micros: i64) -> Self {
        Self(micros)
    }
}

impl Money {
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Whole currency units, e.g. `Money::from_units(25)` is 25.00
    pub const fn from_units(units: i64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    pub fn micros(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Treats `self` as a price per 1000 units and returns the price of `quantity` units.
    ///
    /// The result is rounded half away from zero to the nearest micro-unit.
    pub fn per_thousand(&self, quantity: i64) -> Result<Money, MoneyConversionError> {
        let product = i128::from(self.0) * i128::from(quantity);
        let value = div_round(product, 1000);
        i64::try_from(value)
            .map(Money)
            .map_err(|_| MoneyConversionError(format!("{self} x {quantity} / 1000 overflows")))
    }

    /// Returns `percent`% of this amount, where `percent` is itself a fixed-point decimal (e.g. `2.5` for 2.5%).
    pub fn percentage(&self, percent: Money) -> Result<Money, MoneyConversionError> {
        let product = i128::from(self.0) * i128::from(percent.0);
        let value = div_round(product, 100 * i128::from(MICROS_PER_UNIT));
        i64::try_from(value)
            .map(Money)
            .map_err(|_| MoneyConversionError(format!("{percent}% of {self} overflows")))
    }

    /// Formats the amount with exactly `decimals` fractional digits (rounded half away from zero).
    /// Remote gateways generally want `"10.00"`-style strings.
    pub fn to_fixed(&self, decimals: u32) -> String {
        let decimals = decimals.min(FRACTION_DIGITS as u32);
        let divisor = 10i128.pow(FRACTION_DIGITS as u32 - decimals);
        let scaled = div_round(i128::from(self.0), divisor);
        let sign = if scaled < 0 { "-" } else { "" };
        let scaled = scaled.abs();
        if decimals == 0 {
            return format!("{sign}{scaled}");
        }
        let unit = 10i128.pow(decimals);
        format!("{sign}{}.{:0width$}", scaled / unit, scaled % unit, width = decimals as usize)
    }
}

fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

impl Display for Money {
    /// At least two decimals are always shown; further digits only if they are non-zero.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let full = self.to_fixed(FRACTION_DIGITS as u32);
        let (whole, frac) = full.split_once('.').unwrap_or((full.as_str(), "00"));
        let mut frac = frac.trim_end_matches('0').to_string();
        while frac.len() < 2 {
            frac.push('0');
        }
        write!(f, "{whole}.{frac}")
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses decimal strings such as `"12"`, `"0.50"` or `"-3.1415926"`. Digits beyond the sixth decimal place are
    /// rounded half away from zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MoneyConversionError(format!("'{s}' is not a decimal number"));
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i128>().map_err(|_| err())? };
        let mut micros = whole * i128::from(MICROS_PER_UNIT);
        let kept = &frac[..frac.len().min(FRACTION_DIGITS)];
        if !kept.is_empty() {
            let padded = format!("{kept:0<width$}", width = FRACTION_DIGITS);
            micros += padded.parse::<i128>().map_err(|_| err())?;
        }
        if let Some(next) = frac.chars().nth(FRACTION_DIGITS) {
            if next >= '5' {
                micros += 1;
            }
        }
        if negative {
            micros = -micros;
        }
        i64::try_from(micros).map(Money).map_err(|_| MoneyConversionError(format!("'{s}' is out of range")))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    /// Accepts decimal strings (preferred), integers (whole units) and floats. Floats are converted via their shortest
    /// round-trip representation, so `0.1` becomes exactly `0.10`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Int(i64),
            Float(f64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
            Repr::Int(units) => units
                .checked_mul(MICROS_PER_UNIT)
                .map(Money)
                .ok_or_else(|| de::Error::custom(format!("{units} is out of range"))),
            Repr::Float(f) => f.to_string().parse().map_err(de::Error::custom),
        }
    }
}
