//! Validation utilities for the HomeStock platform
//!
//! Quantity parsing accepts both `.` and `,` as the fractional separator,
//! since the web and mobile clients submit locale-formatted numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a quantity string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quantity: {0}")]
pub struct QuantityParseError(pub String);

// ============================================================================
// Quantity Parsing
// ============================================================================

/// Parse a decimal quantity from user input.
///
/// Accepts `"1.5"` and `"1,5"` identically.
pub fn parse_quantity(raw: &str) -> Result<Decimal, QuantityParseError> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err(QuantityParseError(raw.to_string()));
    }
    Decimal::from_str(&normalized).map_err(|_| QuantityParseError(raw.to_string()))
}

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate that a threshold is not negative
pub fn validate_threshold(threshold: Decimal) -> Result<(), &'static str> {
    if threshold < Decimal::ZERO {
        return Err("Threshold cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Raw quantity as submitted by clients: a JSON number or a locale string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Number(Decimal),
    Text(String),
}

impl RawQuantity {
    fn into_decimal<E: serde::de::Error>(self) -> Result<Decimal, E> {
        match self {
            RawQuantity::Number(n) => Ok(n),
            RawQuantity::Text(s) => parse_quantity(&s).map_err(E::custom),
        }
    }
}

/// Deserialize a required quantity field, accepting `.` or `,` separators
pub fn de_quantity<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    RawQuantity::deserialize(deserializer)?.into_decimal()
}

/// Deserialize an optional quantity field, accepting `.` or `,` separators
pub fn de_quantity_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawQuantity>::deserialize(deserializer)? {
        Some(raw) => raw.into_decimal().map(Some),
        None => Ok(None),
    }
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if validator::validate_email(email) {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate the "days before expiry to warn" user setting
pub fn validate_warn_days(days: i32) -> Result<(), &'static str> {
    if !(1..=365).contains(&days) {
        return Err("Expiry warning window must be between 1 and 365 days");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parse_quantity_accepts_dot_and_comma() {
        assert_eq!(parse_quantity("0.5").unwrap(), dec("0.5"));
        assert_eq!(parse_quantity("0,5").unwrap(), dec("0.5"));
        assert_eq!(parse_quantity(" 2,25 ").unwrap(), dec("2.25"));
    }

    #[test]
    fn parse_quantity_rejects_garbage() {
        assert!(parse_quantity("").is_err());
        assert!(parse_quantity("abc").is_err());
        assert!(parse_quantity("1,2,3").is_err());
    }

    #[test]
    fn positive_quantity_check() {
        assert!(validate_positive_quantity(dec("0.01")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-1")).is_err());
    }

    #[test]
    fn threshold_allows_zero() {
        assert!(validate_threshold(Decimal::ZERO).is_ok());
        assert!(validate_threshold(dec("-0.5")).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Both fractional separators parse to the same value
            #[test]
            fn comma_and_dot_agree(integral in 0u32..1000000, fractional in 0u32..1000) {
                let dotted = format!("{}.{:03}", integral, fractional);
                let commad = dotted.replace('.', ",");

                prop_assert_eq!(
                    parse_quantity(&dotted).unwrap(),
                    parse_quantity(&commad).unwrap()
                );
            }

            /// Canonical decimal strings always parse
            #[test]
            fn canonical_decimals_parse(value in 0i64..10_000_000) {
                let quantity = Decimal::new(value, 2);
                prop_assert_eq!(parse_quantity(&quantity.to_string()).unwrap(), quantity);
            }
        }
    }
}
