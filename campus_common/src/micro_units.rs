use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of micro-units in one whole currency unit (SOL or USDC).
pub const MICRO_UNITS_PER_UNIT: i64 = 1_000_000;
const FRACTION_DIGITS: usize = 6;

//--------------------------------------     MicroUnits       ---------------------------------------------------------
/// An exact monetary amount, stored as an integer number of millionths of a currency unit.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MicroUnits(i64);

op!(binary MicroUnits, Add, add);
op!(binary MicroUnits, Sub, sub);
op!(inplace MicroUnits, AddAssign, add_assign);
op!(inplace MicroUnits, SubAssign, sub_assign);
op!(unary MicroUnits, Neg, neg);

impl Mul<i64> for MicroUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MicroUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented in micro-units: {0}")]
pub struct MicroUnitsConversionError(String);

impl From<i64> for MicroUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MicroUnits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MicroUnits {}

impl TryFrom<u64> for MicroUnits {
    type Error = MicroUnitsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MicroUnitsConversionError(format!("Value {value} is too large to convert to MicroUnits")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

/// Formats with at least two and at most six fractional digits, e.g. `9.50` or `0.000125`.
impl Display for MicroUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / MICRO_UNITS_PER_UNIT as u64;
        let frac = format!("{:06}", abs % MICRO_UNITS_PER_UNIT as u64);
        let trimmed = frac.trim_end_matches('0');
        let frac = if trimmed.len() < 2 { &frac[..2] } else { trimmed };
        write!(f, "{sign}{whole}.{frac}")
    }
}

/// Parses a plain decimal string (`"5"`, `"5.00"`, `"-0.25"`) without any floating point step.
impl FromStr for MicroUnits {
    type Err = MicroUnitsConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MicroUnitsConversionError(s.to_string());
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        if frac.len() > FRACTION_DIGITS {
            return Err(err());
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| err())? };
        let frac = format!("{frac:0<width$}", width = FRACTION_DIGITS).parse::<i64>().map_err(|_| err())?;
        let value = whole.checked_mul(MICRO_UNITS_PER_UNIT).and_then(|w| w.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl MicroUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_units(units: i64) -> Self {
        Self(units * MICRO_UNITS_PER_UNIT)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_decimal_strings() {
        assert_eq!("5.00".parse::<MicroUnits>().unwrap(), MicroUnits::from(5_000_000));
        assert_eq!("5".parse::<MicroUnits>().unwrap(), MicroUnits::from_units(5));
        assert_eq!(".5".parse::<MicroUnits>().unwrap(), MicroUnits::from(500_000));
        assert_eq!("0.000001".parse::<MicroUnits>().unwrap(), MicroUnits::from(1));
        assert_eq!("-3.25".parse::<MicroUnits>().unwrap(), MicroUnits::from(-3_250_000));
        assert!("0.0000001".parse::<MicroUnits>().is_err());
        assert!("1.2.3".parse::<MicroUnits>().is_err());
        assert!("abc".parse::<MicroUnits>().is_err());
        assert!(".".parse::<MicroUnits>().is_err());
        assert!("99999999999999999".parse::<MicroUnits>().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(MicroUnits::from(9_500_000).to_string(), "9.50");
        assert_eq!(MicroUnits::from(10_000_000).to_string(), "10.00");
        assert_eq!(MicroUnits::from(125).to_string(), "0.000125");
        assert_eq!(MicroUnits::from(-500_000).to_string(), "-0.50");
    }

    #[test]
    fn arithmetic() {
        let a = MicroUnits::from_units(5);
        assert_eq!(a * 2, MicroUnits::from_units(10));
        assert_eq!(a - MicroUnits::from_units(1), MicroUnits::from_units(4));
        let total: MicroUnits = vec![a, a, a].into_iter().sum();
        assert_eq!(total, MicroUnits::from_units(15));
        assert!(MicroUnits::from(i64::MAX).checked_mul(2).is_none());
        assert!(MicroUnits::from(i64::MAX).checked_add(MicroUnits::from(1)).is_none());
    }
}
