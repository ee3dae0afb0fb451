//! Blockchain data provider abstraction.
//!
//! A [`Provider`] is a read-only window onto a chain: it answers "what is the
//! balance of this address" and "which transfers reached it". Concrete
//! backends are a closed set of variants behind [`PaymentProvider`]; callers
//! pick one by payment method at construction time rather than inspecting
//! types at runtime.
//!
//! Every data method takes a [`CancellationToken`] and must return promptly
//! on cancellation without partial side effects.

pub mod bsv;
pub mod etherscan;
pub mod mock;

pub use bsv::BsvProvider;
pub use etherscan::EtherscanProvider;
pub use mock::MockProvider;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::timestamp::UnixTimestamp;
use crate::token::{TokenAmountError, TokenType};

/// A single on-chain transfer observed by a provider.
///
/// Immutable once constructed; only providers produce these. Addresses are
/// kept exactly as the chain reported them since case sensitivity is
/// chain-dependent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque provider-specific identifier, unique per chain.
    pub hash: String,
    /// Sender address, original casing preserved.
    pub from: String,
    /// Recipient address, original casing preserved.
    pub to: String,
    /// Transfer amount in human units, already converted from base units.
    pub amount: Decimal,
    /// Token the transfer moved.
    pub token: TokenType,
    /// Block number, a monotonic ordering proxy.
    pub block_number: u64,
    /// Wall-clock time of block inclusion.
    pub timestamp: UnixTimestamp,
    /// Whether the transfer has been confirmed on-chain.
    pub confirmed: bool,
}

/// Point-in-time balance snapshot for one address and token.
///
/// Never persisted; recomputed on every verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    /// Address the balance was read for.
    pub address: String,
    /// Balance in human units.
    pub balance: Decimal,
    /// Token the balance is denominated in.
    pub token: TokenType,
    /// When the snapshot was taken.
    pub as_of: UnixTimestamp,
    /// Name of the provider that produced the snapshot.
    pub provider: String,
}

/// Request value object narrowing a transaction listing.
///
/// All fields beyond address and token are optional and combine with AND
/// semantics. Upstream APIs rarely support timestamp-range queries, so
/// providers fetch broadly and apply [`TransactionQuery::matches`]
/// client-side after unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    /// Recipient address to list incoming transfers for.
    pub address: String,
    /// Token to list transfers of.
    pub token: TokenType,
    /// Only transfers included at or after this time.
    pub after: Option<UnixTimestamp>,
    /// Only transfers included at or before this time.
    pub before: Option<UnixTimestamp>,
    /// Only transfers of at least this amount (human units).
    pub min_amount: Option<Decimal>,
}

impl TransactionQuery {
    /// Creates a query for all incoming transfers of `token` to `address`.
    pub fn new(address: impl Into<String>, token: TokenType) -> Self {
        TransactionQuery {
            address: address.into(),
            token,
            after: None,
            before: None,
            min_amount: None,
        }
    }

    /// Restricts the query to transfers at or after `ts`.
    pub fn after(mut self, ts: UnixTimestamp) -> Self {
        self.after = Some(ts);
        self
    }

    /// Restricts the query to transfers at or before `ts`.
    pub fn before(mut self, ts: UnixTimestamp) -> Self {
        self.before = Some(ts);
        self
    }

    /// Restricts the query to transfers of at least `amount` human units.
    pub fn min_amount(mut self, amount: Decimal) -> Self {
        self.min_amount = Some(amount);
        self
    }

    /// Whether a transfer satisfies every bound of this query.
    ///
    /// The recipient comparison is case-insensitive: EVM addresses are
    /// hex-cased arbitrarily by upstreams, while the record itself keeps the
    /// original casing.
    pub fn matches(&self, tx: &Transaction) -> bool {
        if tx.token != self.token {
            return false;
        }
        if !tx.to.eq_ignore_ascii_case(&self.address) {
            return false;
        }
        if self.after.is_some_and(|after| tx.timestamp < after) {
            return false;
        }
        if self.before.is_some_and(|before| tx.timestamp > before) {
            return false;
        }
        if self.min_amount.is_some_and(|min| tx.amount < min) {
            return false;
        }
        true
    }
}

/// Errors a provider call can fail with.
///
/// Domain outcomes (no payment yet) are *not* errors; these variants all mean
/// the verification could not be performed. [`ProviderError::is_retryable`]
/// separates transient failures from configuration and data faults.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The token is not in the provider's supported set.
    #[error("Token {token} is not supported by provider {provider}")]
    UnsupportedToken {
        /// Provider that rejected the request.
        provider: String,
        /// Token that was requested.
        token: TokenType,
    },
    /// The provider declares the token as supported but has no backing data
    /// source yet. Distinct from [`ProviderError::UnsupportedToken`] so
    /// routing can give operators different guidance.
    #[error("Provider {0} is not implemented yet")]
    NotImplemented(String),
    /// The upstream rejected the request and no API key is configured.
    #[error("No API key configured for {provider}: set {env_hint} or pass --api-key")]
    MissingApiKey {
        /// Provider that required the key.
        provider: String,
        /// Environment variable the operator should set.
        env_hint: &'static str,
    },
    /// The upstream throttled the request. Retryable with backoff.
    #[error("Rate limit exceeded or invalid API key: {0}")]
    RateLimited(String),
    /// Connection failure, timeout, or non-2xx HTTP status. Retryable.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The upstream reported an API-level failure with a key present.
    #[error("Provider API error: {0}")]
    Api(String),
    /// The upstream response could not be parsed. Not retryable; no partial
    /// recovery or default-to-zero is attempted.
    #[error("Malformed provider response: {0}")]
    Data(String),
    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether the caller may retry the request at its discretion.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Transport(_)
        )
    }
}

impl From<TokenAmountError> for ProviderError {
    fn from(err: TokenAmountError) -> Self {
        ProviderError::Data(err.to_string())
    }
}

/// Read-only chain data source.
///
/// Implemented by the concrete backends and by [`PaymentProvider`], which
/// dispatches over them. Methods accept a [`CancellationToken`] and return
/// [`ProviderError::Cancelled`] promptly when it fires.
pub trait Provider {
    /// Reads the current balance of `address` for `token`.
    ///
    /// A provider that does not support `token` must fail with
    /// [`ProviderError::UnsupportedToken`] rather than return a zero
    /// balance, which would be indistinguishable from "no payment found".
    fn balance(
        &self,
        address: &str,
        token: TokenType,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BalanceResult, ProviderError>> + Send;

    /// Lists incoming transfers matching `query`.
    ///
    /// "No transfers found" is a successful empty list, never an error.
    fn transactions(
        &self,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, ProviderError>> + Send;

    /// Stable provider name, recorded on every result it produces.
    fn name(&self) -> &str;

    /// Tokens this provider can answer for.
    ///
    /// A token may be declared here while the data methods still return
    /// [`ProviderError::NotImplemented`]; callers discover that without
    /// runtime surprises elsewhere.
    fn supported_tokens(&self) -> &[TokenType];
}

impl<T: Provider + Sync> Provider for Arc<T> {
    fn balance(
        &self,
        address: &str,
        token: TokenType,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BalanceResult, ProviderError>> + Send {
        self.as_ref().balance(address, token, cancel)
    }

    fn transactions(
        &self,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, ProviderError>> + Send {
        self.as_ref().transactions(query, cancel)
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn supported_tokens(&self) -> &[TokenType] {
        self.as_ref().supported_tokens()
    }
}

/// Closed set of provider backends.
///
/// Callers select a variant by payment method when building the verification
/// pipeline; the rest of the system stays polymorphic over [`Provider`].
#[derive(Debug)]
pub enum PaymentProvider {
    /// Etherscan-compatible multichain explorer (USDC on Ethereum).
    Etherscan(EtherscanProvider),
    /// Bitcoin SV explorer, declared but not yet implemented.
    Bsv(BsvProvider),
    /// Deterministic, network-free test double.
    Mock(MockProvider),
}

impl Provider for PaymentProvider {
    fn balance(
        &self,
        address: &str,
        token: TokenType,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BalanceResult, ProviderError>> + Send {
        async move {
            match self {
                PaymentProvider::Etherscan(p) => p.balance(address, token, cancel).await,
                PaymentProvider::Bsv(p) => p.balance(address, token, cancel).await,
                PaymentProvider::Mock(p) => p.balance(address, token, cancel).await,
            }
        }
    }

    fn transactions(
        &self,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, ProviderError>> + Send {
        async move {
            match self {
                PaymentProvider::Etherscan(p) => p.transactions(query, cancel).await,
                PaymentProvider::Bsv(p) => p.transactions(query, cancel).await,
                PaymentProvider::Mock(p) => p.transactions(query, cancel).await,
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            PaymentProvider::Etherscan(p) => p.name(),
            PaymentProvider::Bsv(p) => p.name(),
            PaymentProvider::Mock(p) => p.name(),
        }
    }

    fn supported_tokens(&self) -> &[TokenType] {
        match self {
            PaymentProvider::Etherscan(p) => p.supported_tokens(),
            PaymentProvider::Bsv(p) => p.supported_tokens(),
            PaymentProvider::Mock(p) => p.supported_tokens(),
        }
    }
}

impl From<EtherscanProvider> for PaymentProvider {
    fn from(provider: EtherscanProvider) -> Self {
        PaymentProvider::Etherscan(provider)
    }
}

impl From<BsvProvider> for PaymentProvider {
    fn from(provider: BsvProvider) -> Self {
        PaymentProvider::Bsv(provider)
    }
}

impl From<MockProvider> for PaymentProvider {
    fn from(provider: MockProvider) -> Self {
        PaymentProvider::Mock(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn transfer(amount: &str, to: &str, at: u64) -> Transaction {
        Transaction {
            hash: "0xabc".to_string(),
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: to.to_string(),
            amount: Decimal::from_str(amount).expect("decimal"),
            token: TokenType::Usdc,
            block_number: 1,
            timestamp: UnixTimestamp::from_secs(at),
            confirmed: true,
        }
    }

    const WALLET: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn query_bounds_are_additive() {
        let query = TransactionQuery::new(WALLET, TokenType::Usdc)
            .after(UnixTimestamp::from_secs(100))
            .before(UnixTimestamp::from_secs(200))
            .min_amount(Decimal::from(50));

        assert!(query.matches(&transfer("75", WALLET, 150)));
        assert!(!query.matches(&transfer("75", WALLET, 99)));
        assert!(!query.matches(&transfer("75", WALLET, 201)));
        assert!(!query.matches(&transfer("49", WALLET, 150)));
    }

    #[test]
    fn query_recipient_compare_is_case_insensitive() {
        let query = TransactionQuery::new(WALLET.to_uppercase(), TokenType::Usdc);
        assert!(query.matches(&transfer("10", WALLET, 50)));
    }

    #[test]
    fn query_rejects_other_recipients_and_tokens() {
        let query = TransactionQuery::new(WALLET, TokenType::Usdc);
        assert!(!query.matches(&transfer(
            "10",
            "0x3333333333333333333333333333333333333333",
            50
        )));

        let mut bsv_transfer = transfer("10", WALLET, 50);
        bsv_transfer.token = TokenType::Bsv;
        assert!(!query.matches(&bsv_transfer));
    }

    #[test]
    fn retryable_errors_are_the_transient_subset() {
        assert!(ProviderError::RateLimited("slow down".to_string()).is_retryable());
        assert!(ProviderError::Transport("connection reset".to_string()).is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
        assert!(
            !ProviderError::MissingApiKey {
                provider: "etherscan".to_string(),
                env_hint: "ETHERSCAN_API_KEY",
            }
            .is_retryable()
        );
        assert!(!ProviderError::Data("bad json".to_string()).is_retryable());
    }
}
