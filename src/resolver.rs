//! Payment method definitions and wallet address resolution.
//!
//! An invoice can carry its own wallet address for a given payment method;
//! otherwise the business-wide configured address applies. Resolution is
//! strict: a crypto method with no address anywhere is a configuration
//! error, and non-crypto methods are rejected outright rather than silently
//! ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use crate::invoice::Invoice;
use crate::token::TokenType;

/// How a client pays an invoice.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// USDC on Ethereum.
    #[serde(rename = "usdc")]
    Usdc,
    /// Bitcoin SV.
    #[serde(rename = "bsv")]
    Bsv,
    /// Domestic bank transfer.
    #[serde(rename = "bank-transfer")]
    BankTransfer,
    /// International wire.
    #[serde(rename = "wire")]
    Wire,
    /// Anything else agreed out of band.
    #[serde(rename = "other")]
    Other,
}

impl PaymentMethod {
    /// The token verified on-chain for this method, if it is a crypto method.
    pub fn token(&self) -> Option<TokenType> {
        match self {
            PaymentMethod::Usdc => Some(TokenType::Usdc),
            PaymentMethod::Bsv => Some(TokenType::Bsv),
            PaymentMethod::BankTransfer | PaymentMethod::Wire | PaymentMethod::Other => None,
        }
    }

    /// Whether on-chain verification applies to this method.
    pub fn is_crypto(&self) -> bool {
        self.token().is_some()
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Usdc => "usdc",
            PaymentMethod::Bsv => "bsv",
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::Wire => "wire",
            PaymentMethod::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown payment method: {0:?}")]
pub struct UnknownMethodError(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usdc" => Ok(PaymentMethod::Usdc),
            "bsv" => Ok(PaymentMethod::Bsv),
            "bank-transfer" => Ok(PaymentMethod::BankTransfer),
            "wire" => Ok(PaymentMethod::Wire),
            "other" => Ok(PaymentMethod::Other),
            other => Err(UnknownMethodError(other.to_string())),
        }
    }
}

/// Address resolution failures. All are configuration errors: surfaced
/// immediately, never retried.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ResolveError {
    /// The method does not settle on a chain this application can observe.
    #[error("Payment method {method} is not supported for on-chain verification")]
    NonCryptoMethod {
        /// Method that was requested.
        method: PaymentMethod,
    },
    /// Neither the invoice nor the business configuration names an address.
    #[error("No wallet address configured for payment method {method}")]
    NoAddressConfigured {
        /// Method that was requested.
        method: PaymentMethod,
    },
}

/// Returns the wallet address to verify `invoice` against for `method`.
///
/// Precedence:
/// 1. a non-empty per-invoice override for the method,
/// 2. a non-empty business-level default for the method,
/// 3. otherwise [`ResolveError::NoAddressConfigured`].
///
/// Empty or whitespace-only entries are treated as absent and fall through.
pub fn resolve_address(
    invoice: &Invoice,
    method: PaymentMethod,
    defaults: &HashMap<PaymentMethod, String>,
) -> Result<String, ResolveError> {
    if !method.is_crypto() {
        return Err(ResolveError::NonCryptoMethod { method });
    }
    if let Some(override_address) = invoice.payment_addresses.get(&method) {
        let trimmed = override_address.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    if let Some(default_address) = defaults.get(&method) {
        let trimmed = default_address.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    Err(ResolveError::NoAddressConfigured { method })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERRIDE: &str = "0x1111111111111111111111111111111111111111";
    const DEFAULT: &str = "0x2222222222222222222222222222222222222222";

    fn defaults() -> HashMap<PaymentMethod, String> {
        HashMap::from([(PaymentMethod::Usdc, DEFAULT.to_string())])
    }

    #[test]
    fn override_wins_over_default() {
        let mut invoice = Invoice::sample("INV-001");
        invoice
            .payment_addresses
            .insert(PaymentMethod::Usdc, OVERRIDE.to_string());
        let address = resolve_address(&invoice, PaymentMethod::Usdc, &defaults())
            .expect("resolves to override");
        assert_eq!(address, OVERRIDE);
    }

    #[test]
    fn falls_back_to_default_without_override() {
        let invoice = Invoice::sample("INV-001");
        let address =
            resolve_address(&invoice, PaymentMethod::Usdc, &defaults()).expect("resolves");
        assert_eq!(address, DEFAULT);
    }

    #[test]
    fn empty_override_is_treated_as_absent() {
        let mut invoice = Invoice::sample("INV-001");
        invoice
            .payment_addresses
            .insert(PaymentMethod::Usdc, "  ".to_string());
        let address =
            resolve_address(&invoice, PaymentMethod::Usdc, &defaults()).expect("resolves");
        assert_eq!(address, DEFAULT);
    }

    #[test]
    fn missing_everywhere_is_a_configuration_error() {
        let invoice = Invoice::sample("INV-001");
        let result = resolve_address(&invoice, PaymentMethod::Usdc, &HashMap::new());
        assert_eq!(
            result,
            Err(ResolveError::NoAddressConfigured {
                method: PaymentMethod::Usdc
            })
        );
    }

    #[test]
    fn non_crypto_methods_are_rejected_before_lookup() {
        let mut invoice = Invoice::sample("INV-001");
        // Even a configured override must not make a wire transfer resolvable.
        invoice
            .payment_addresses
            .insert(PaymentMethod::Wire, "some-iban".to_string());
        let result = resolve_address(&invoice, PaymentMethod::Wire, &defaults());
        assert_eq!(
            result,
            Err(ResolveError::NonCryptoMethod {
                method: PaymentMethod::Wire
            })
        );
    }

    #[test]
    fn method_parses_from_cli_strings() {
        assert_eq!(
            PaymentMethod::from_str("usdc").expect("parses"),
            PaymentMethod::Usdc
        );
        assert_eq!(
            PaymentMethod::from_str("bank-transfer").expect("parses"),
            PaymentMethod::BankTransfer
        );
        assert!(PaymentMethod::from_str("cheque").is_err());
    }
}
