//! # Money Module
//!
//! Provides the `Money` type for product prices.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Clients send prices as JSON numbers:                                   │
//! │    { "price": 10.1 }  →  f64 10.0999999999999996447...                  │
//! │                                                                         │
//! │  Comparing two such values during reconciliation ("did the price       │
//! │  change?") would flap on representation noise.                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Parse once at the edge, round to the 2-digit fraction, store i64.   │
//! │    Equality is exact from then on.                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Money serializes as a JSON decimal number (`1099` cents → `10.99`).
//! Deserialization accepts a JSON number or a decimal string (`"10.99"`),
//! because clients send both.
//!
//! ## Usage
//! ```rust
//! use stockhub_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! assert_eq!(price.to_decimal_string(), "10.99");
//!
//! let parsed = Money::parse_decimal("10.5").unwrap();
//! assert_eq!(parsed.cents(), 1050);
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are representable so validation can
///   reject them with a proper error instead of a parse failure
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Custom serde**: decimal on the wire, cents everywhere else
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use stockhub_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -5.50, not -4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a decimal string such as `"10"`, `"10.5"`, `"-3.25"`.
    ///
    /// ## Rules
    /// - Optional leading sign
    /// - At most one decimal point
    /// - Digits beyond the second fraction digit are rounded half away
    ///   from zero (`"0.125"` → 13 cents)
    ///
    /// ## Example
    /// ```rust
    /// use stockhub_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("10.00").unwrap().cents(), 1000);
    /// assert_eq!(Money::parse_decimal("0.125").unwrap().cents(), 13);
    /// assert!(Money::parse_decimal("ten").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: format!("'{}' is not a decimal amount", input),
        };

        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        let mut digits = fraction.chars().map(|c| i64::from(c as u8 - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().map(|d| d >= 5).unwrap_or(false);

        let cents = whole_value
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Converts a floating point amount, rounding to the nearest cent.
    ///
    /// Only used at the wire boundary where JSON numbers arrive as f64.
    pub fn from_f64(amount: f64) -> Result<Self, ValidationError> {
        let cents = (amount * 100.0).round();
        if !cents.is_finite() || cents > i64::MAX as f64 || cents < i64::MIN as f64 {
            return Err(ValidationError::InvalidFormat {
                field: "price".to_string(),
                reason: format!("{} is not a representable amount", amount),
            });
        }
        Ok(Money(cents as i64))
    }

    /// Formats as a plain decimal string with two fraction digits.
    ///
    /// ## Example
    /// ```rust
    /// use stockhub_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-550).to_decimal_string(), "-5.50");
    /// ```
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.minor())
    }

    /// Returns the amount as f64 (for JSON output only).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse_decimal(v).map_err(E::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
