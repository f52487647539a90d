use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// An exact amount in minor currency units (cents).
///
/// All arithmetic stays on the inner integer; the only place a decimal
/// representation appears is `parse_str`, which converts boundary input like
/// "$1,234.56" before any computation happens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Money(i64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoneyParseError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// YNAB reports amounts in milliunits (1/1000 of the currency unit).
    /// For USD these are always whole cents; rounding is half-away-from-zero
    /// in case a source ever produces an odd milliunit value.
    pub fn from_milliunits(milliunits: i64) -> Self {
        let half = if milliunits >= 0 { 5 } else { -5 };
        Money((milliunits + half) / 10)
    }

    pub fn zero() -> Self {
        Money(0)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Parses a human-formatted amount ("$1,234.56", "(75.25)", "-5.00")
    /// into cents. Accounting-style parentheses mean negative.
    pub fn parse_str(s: &str) -> Result<Self, MoneyParseError> {
        let s = s.trim();
        let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
            (true, &s[1..s.len() - 1])
        } else {
            (false, s)
        };
        let cleaned = s.replace([',', '$', ' '], "");
        let mut dec = Decimal::from_str(&cleaned)
            .map_err(|_| MoneyParseError::InvalidAmount(s.to_string()))?;
        if negative {
            dec = -dec;
        }
        let cents = (dec * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| MoneyParseError::InvalidAmount(s.to_string()))?;
        Ok(Money(cents))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let a = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", a / 100, a % 100)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |a, b| a + b)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |a, b| a + *b)
    }
}
