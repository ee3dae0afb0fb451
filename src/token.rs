//! Token definitions and base-unit amount conversion.
//!
//! Providers report token amounts as integer strings in the token's smallest
//! unit (USDC's micro-unit, BSV's satoshi). [`TokenAmount`] keeps those values
//! as integers for as long as possible and performs a single exact scale
//! conversion at the boundary, so equality and tolerance comparisons never
//! accumulate floating-point error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// Tokens the application can verify payments in.
///
/// Identifies both the asset and which decimal/contract rules apply. A
/// provider that does not list a token in its supported set must refuse the
/// request rather than answer with a zero balance.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    /// USD Coin (ERC-20). 6 decimal places, not the 18 common to most tokens.
    #[serde(rename = "usdc")]
    Usdc,
    /// Bitcoin SV. 8 decimal places.
    #[serde(rename = "bsv")]
    Bsv,
}

impl TokenType {
    /// Return all known [`TokenType`] variants.
    pub fn variants() -> &'static [TokenType] {
        &[TokenType::Usdc, TokenType::Bsv]
    }

    /// Number of decimal places between the smallest unit and one whole token.
    pub fn decimals(&self) -> u32 {
        match self {
            TokenType::Usdc => 6,
            TokenType::Bsv => 8,
        }
    }

    /// Currency code used on invoices and in verification summaries.
    pub fn code(&self) -> &'static str {
        match self {
            TokenType::Usdc => "USDC",
            TokenType::Bsv => "BSV",
        }
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Usdc => write!(f, "usdc"),
            TokenType::Bsv => write!(f, "bsv"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown token: {0}")]
pub struct UnknownTokenError(pub String);

impl FromStr for TokenType {
    type Err = UnknownTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usdc" => Ok(TokenType::Usdc),
            "bsv" => Ok(TokenType::Bsv),
            other => Err(UnknownTokenError(other.to_string())),
        }
    }
}

/// Errors that can occur converting between base units and decimal amounts.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TokenAmountError {
    /// The provider-native integer string could not be parsed.
    #[error("Invalid base-unit amount: {0:?}")]
    InvalidBaseUnits(String),
    /// The value does not fit the decimal representation.
    #[error("Amount out of representable range")]
    OutOfRange,
    /// The decimal input carries more precision than the token supports.
    #[error("Too big of a precision: {amount} vs {token} on token")]
    WrongPrecision {
        /// Decimal places in the input.
        amount: u32,
        /// Decimal places supported by the token.
        token: u32,
    },
    /// Negative values are not allowed.
    #[error("Negative value is not allowed")]
    Negative,
}

/// A precise token amount in base units (e.g., USDC micro-units).
///
/// Wraps the raw integer so arithmetic stays exact; conversion to human
/// units is `value / 10^decimals`, performed once via
/// [`TokenAmount::to_decimal`].
///
/// # Example
///
/// ```
/// use chainvoice::token::{TokenAmount, TokenType};
///
/// let amount = TokenAmount::parse_base_units("100000000").unwrap();
/// let human = amount.to_decimal(TokenType::Usdc).unwrap();
/// assert_eq!(human.to_string(), "100.000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Wraps a raw base-unit value.
    pub fn from_base_units(value: u128) -> Self {
        TokenAmount(value)
    }

    /// Parses a provider-native integer string (base units, no decimal point).
    ///
    /// # Errors
    ///
    /// Fails on empty input, non-digit characters, or values exceeding
    /// `u128::MAX`. Providers hand these strings over verbatim, so a parse
    /// failure means the upstream response is malformed.
    pub fn parse_base_units(s: &str) -> Result<Self, TokenAmountError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TokenAmountError::InvalidBaseUnits(s.to_string()));
        }
        let value = trimmed
            .parse::<u128>()
            .map_err(|_| TokenAmountError::InvalidBaseUnits(s.to_string()))?;
        Ok(TokenAmount(value))
    }

    /// Returns the raw base-unit value.
    pub fn base_units(&self) -> u128 {
        self.0
    }

    /// Converts to a human-unit decimal: `value / 10^decimals`, exactly.
    ///
    /// The division happens once, as a scale assignment on the integer
    /// mantissa, so no rounding ever occurs.
    ///
    /// # Errors
    ///
    /// Returns [`TokenAmountError::OutOfRange`] if the value exceeds what a
    /// 96-bit decimal mantissa can hold. Real balances sit far below that.
    pub fn to_decimal(&self, token: TokenType) -> Result<Decimal, TokenAmountError> {
        let mantissa = i128::try_from(self.0).map_err(|_| TokenAmountError::OutOfRange)?;
        Decimal::try_from_i128_with_scale(mantissa, token.decimals())
            .map_err(|_| TokenAmountError::OutOfRange)
    }

    /// Converts a human-unit decimal into base units.
    ///
    /// # Errors
    ///
    /// Fails if the input is negative, carries more decimal places than the
    /// token supports, or overflows `u128`.
    pub fn from_decimal(amount: Decimal, token: TokenType) -> Result<Self, TokenAmountError> {
        if amount.is_sign_negative() {
            return Err(TokenAmountError::Negative);
        }
        let scale = amount.scale();
        let token_decimals = token.decimals();
        if scale > token_decimals {
            return Err(TokenAmountError::WrongPrecision {
                amount: scale,
                token: token_decimals,
            });
        }
        let mantissa = amount.mantissa().unsigned_abs();
        let multiplier = 10u128
            .checked_pow(token_decimals - scale)
            .ok_or(TokenAmountError::OutOfRange)?;
        let base = mantissa
            .checked_mul(multiplier)
            .ok_or(TokenAmountError::OutOfRange)?;
        Ok(TokenAmount(base))
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        TokenAmount(value)
    }
}
