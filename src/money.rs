//! Human-readable currency amount parsing.
//!
//! Invoice totals arrive from configuration files and CLI flags as
//! human-readable strings. [`MoneyAmount`] parses them into precise decimal
//! values suitable for comparison against on-chain token amounts.
//!
//! # Supported Formats
//!
//! - Plain numbers: `"100"`, `"0.01"`
//! - With currency symbols: `"$10.50"`
//! - With thousand separators: `"1,000"`, `"1,000,000.50"`

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// A parsed monetary amount with decimal precision.
///
/// Represents a non-negative decimal value parsed from a human-readable
/// string. The original precision is preserved, which matters when the value
/// is later compared against a token amount with specific decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyAmount(pub Decimal);

impl MoneyAmount {
    /// Returns the number of decimal places in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Returns the value as an unsigned integer (without decimal point).
    ///
    /// For example, `"12.34"` returns `1234`.
    pub fn mantissa(&self) -> u128 {
        self.0.mantissa().unsigned_abs()
    }

    /// Returns the underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }
}

/// Errors that can occur when parsing a monetary amount.
#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    /// The input string could not be parsed as a number.
    #[error("Invalid number format")]
    InvalidFormat,
    /// The value is outside the allowed range.
    #[error(
        "Amount must be between {} and {}",
        constants::MIN_STR,
        constants::MAX_STR
    )]
    OutOfRange,
    /// Negative values are not allowed.
    #[error("Negative value is not allowed")]
    Negative,
}

mod constants {
    use super::*;
    use std::sync::LazyLock;

    pub const MIN_STR: &str = "0.000000001";
    pub const MAX_STR: &str = "999999999";

    pub static MIN: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MIN_STR).expect("valid decimal"));
    pub static MAX: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));
}

static CLEAN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d\.\-]+").expect("valid regex for amount cleaning"));

impl MoneyAmount {
    /// Parses a human-readable currency string into a [`MoneyAmount`].
    ///
    /// Currency symbols, thousand separators, and whitespace are stripped
    /// before parsing. The result must be a non-negative number within the
    /// allowed range.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The string cannot be parsed as a number
    /// - The value is negative
    /// - The value is outside the allowed range
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        let cleaned = CLEAN_REGEX.replace_all(input, "").to_string();

        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;

        if parsed.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }

        if parsed < *constants::MIN || parsed > *constants::MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }

        Ok(MoneyAmount(parsed))
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl TryFrom<&str> for MoneyAmount {
    type Error = MoneyAmountParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MoneyAmount::from_str(value)
    }
}

impl From<u128> for MoneyAmount {
    fn from(value: u128) -> Self {
        MoneyAmount(Decimal::from(value))
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_numbers() {
        let amount = MoneyAmount::parse("100").expect("parses");
        assert_eq!(amount.amount(), Decimal::from(100));
        assert_eq!(amount.scale(), 0);
    }

    #[test]
    fn parses_currency_symbols_and_separators() {
        let amount = MoneyAmount::parse("$1,250.50").expect("parses");
        assert_eq!(amount.scale(), 2);
        assert_eq!(amount.mantissa(), 125050);
    }

    #[test]
    fn rejects_negative() {
        let result = MoneyAmount::parse("-10");
        assert!(matches!(result, Err(MoneyAmountParseError::Negative)));
    }

    #[test]
    fn rejects_garbage() {
        let result = MoneyAmount::parse("ten dollars");
        assert!(matches!(result, Err(MoneyAmountParseError::InvalidFormat)));
    }

    #[test]
    fn rejects_out_of_range() {
        let result = MoneyAmount::parse("1000000000");
        assert!(matches!(result, Err(MoneyAmountParseError::OutOfRange)));
    }
}
