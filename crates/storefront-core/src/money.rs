//! # Money Module
//!
//! Provides the `Money` type used for product prices.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The product API sends prices as JSON decimals:  "price": 9.99          │
//! │  Stored as f64 and summed, 0.1 + 0.2 = 0.30000000000000004              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    JSON 9.99  ──► Money(999)  ──► SQLite price_cents = 999              │
//! │    Money(999) ──► JSON 9.99   (snapshot blobs keep the wire shape)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! assert_eq!(price.to_string(), "$10.99");
//!
//! let parsed = Money::from_decimal(10.99).unwrap();
//! assert_eq!(parsed, price);
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// =============================================================================
// Money Type
// =============================================================================

/// A price in the smallest currency unit (cents).
///
/// ## Wire Representation
/// Serializes as a decimal number (`10.99`), not as cents. The remote
/// endpoint and the favorite snapshot blob both carry decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount (dollars) into cents.
    ///
    /// Rounds half away from zero to the nearest cent. Returns `None` for
    /// NaN, infinities and values outside the `i64` cent range.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(12.5).unwrap().cents(), 1250);
    /// assert_eq!(Money::from_decimal(0.005).unwrap().cents(), 1);
    /// assert!(Money::from_decimal(f64::NAN).is_none());
    /// ```
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if cents < i64::MIN as f64 || cents >= i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal amount (for the wire format only).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display. The presentation layer formats for locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::from_decimal(amount)
            .ok_or_else(|| de::Error::custom(format!("price out of range: {}", amount)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_to_cents() {
        assert_eq!(Money::from_decimal(9.99).unwrap().cents(), 999);
        assert_eq!(Money::from_decimal(1549.0).unwrap().cents(), 154900);
        assert_eq!(Money::from_decimal(0.1 + 0.2).unwrap().cents(), 30);
        assert_eq!(Money::from_decimal(-2.5).unwrap().cents(), -250);
    }

    #[test]
    fn test_from_decimal_rejects_non_finite() {
        assert!(Money::from_decimal(f64::INFINITY).is_none());
        assert!(Money::from_decimal(f64::NEG_INFINITY).is_none());
        assert!(Money::from_decimal(f64::NAN).is_none());
        assert!(Money::from_decimal(1e300).is_none());
    }

    #[test]
    fn test_from_decimal_rejects_two_pow_63_cents() {
        // 92233720368547760.0 * 100 rounds to exactly 2^63
        assert!(Money::from_decimal(92_233_720_368_547_760.0).is_none());
        assert_eq!(
            Money::from_decimal(-92_233_720_368_547_758.08).map(|m| m.cents()),
            Some(i64::MIN)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_serializes_as_decimal() {
        let json = serde_json::to_string(&Money::from_cents(1099)).unwrap();
        assert_eq!(json, "10.99");

        let parsed: Money = serde_json::from_str("549.99").unwrap();
        assert_eq!(parsed.cents(), 54999);

        let whole: Money = serde_json::from_str("12").unwrap();
        assert_eq!(whole.cents(), 1200);
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert!(serde_json::from_str::<Money>("\"9.99\"").is_err());
    }
}
