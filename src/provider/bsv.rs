//! Bitcoin SV provider stub.
//!
//! Declares BSV as a supported token and reports a real name, but has no
//! backing data source yet: every data-returning method fails with
//! [`ProviderError::NotImplemented`]. Callers can therefore discover
//! supported-but-unimplemented tokens up front instead of tripping over them
//! mid-verification, and routing logic can tell this state apart from "token
//! not supported at all".

use tokio_util::sync::CancellationToken;

use crate::provider::{BalanceResult, Provider, ProviderError, Transaction, TransactionQuery};
use crate::token::TokenType;

const PROVIDER_NAME: &str = "bsv";

static SUPPORTED: &[TokenType] = &[TokenType::Bsv];

/// Placeholder [`Provider`] for Bitcoin SV.
#[derive(Debug, Default)]
pub struct BsvProvider;

impl BsvProvider {
    pub fn new() -> Self {
        BsvProvider
    }

    fn ensure_supported(&self, token: TokenType) -> Result<(), ProviderError> {
        if SUPPORTED.contains(&token) {
            Ok(())
        } else {
            Err(ProviderError::UnsupportedToken {
                provider: PROVIDER_NAME.to_string(),
                token,
            })
        }
    }
}

impl Provider for BsvProvider {
    fn balance(
        &self,
        _address: &str,
        token: TokenType,
        _cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BalanceResult, ProviderError>> + Send {
        async move {
            self.ensure_supported(token)?;
            Err(ProviderError::NotImplemented(PROVIDER_NAME.to_string()))
        }
    }

    fn transactions(
        &self,
        query: &TransactionQuery,
        _cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, ProviderError>> + Send {
        async move {
            self.ensure_supported(query.token)?;
            Err(ProviderError::NotImplemented(PROVIDER_NAME.to_string()))
        }
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supported_tokens(&self) -> &[TokenType] {
        SUPPORTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn declares_bsv_but_returns_not_implemented() {
        let provider = BsvProvider::new();
        assert_eq!(provider.supported_tokens(), &[TokenType::Bsv]);
        assert_eq!(provider.name(), "bsv");

        let cancel = CancellationToken::new();
        let result = provider.balance("1BitcoinAddress", TokenType::Bsv, &cancel).await;
        assert!(matches!(result, Err(ProviderError::NotImplemented(_))));

        let query = TransactionQuery::new("1BitcoinAddress", TokenType::Bsv);
        let result = provider.transactions(&query, &cancel).await;
        assert!(matches!(result, Err(ProviderError::NotImplemented(_))));
    }

    #[tokio::test]
    async fn unsupported_token_is_a_distinct_error() {
        let provider = BsvProvider::new();
        let cancel = CancellationToken::new();
        let result = provider.balance("0xabc", TokenType::Usdc, &cancel).await;
        assert!(matches!(
            result,
            Err(ProviderError::UnsupportedToken { .. })
        ));
    }
}
