//! Payment verification engine.
//!
//! Compares an invoice's expected amount against the evidence a provider
//! reports for the resolved wallet address and classifies the outcome into
//! exactly one [`PaymentStatus`]. Classification is evaluated once per call;
//! there are no intermediate states.
//!
//! `Partial`, `NotFound`, and `Pending` are valid results, not errors: the
//! verification ran successfully and payment simply has not cleared.
//! Errors mean the verification could not be performed at all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;
use tokio_util::sync::CancellationToken;

use crate::invoice::Invoice;
use crate::provider::{Provider, ProviderError, Transaction, TransactionQuery};
use crate::resolver::{PaymentMethod, ResolveError, resolve_address};
use crate::timestamp::UnixTimestamp;
use crate::token::TokenType;

/// Total, mutually exclusive classification of a verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Observed balance equals the expected amount.
    Verified,
    /// Observed balance exceeds the expected amount.
    Overpaid,
    /// Some payment arrived, but less than expected.
    Partial,
    /// No payment observed at all.
    NotFound,
    /// A matching transfer exists but has not been confirmed yet.
    Pending,
}

impl PaymentStatus {
    /// Whether this outcome may trigger the paid-marking transition.
    ///
    /// Only `Verified` and `Overpaid` are successful terminal outcomes;
    /// the rest are informational and never mutate invoice state.
    pub fn is_successful(&self) -> bool {
        matches!(self, PaymentStatus::Verified | PaymentStatus::Overpaid)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Verified => "verified",
            PaymentStatus::Overpaid => "overpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::NotFound => "not-found",
            PaymentStatus::Pending => "pending",
        };
        write!(f, "{}", s)
    }
}

/// The engine's output: one classified verification, constructed once per
/// call. Mutating invoice state is a separate, explicit step
/// ([`crate::invoice::mark_paid`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub status: PaymentStatus,
    /// Amount the invoice expects, in `currency`.
    pub expected: Decimal,
    /// Amount observed at the wallet address, in `currency`.
    pub received: Decimal,
    /// Currency code both amounts share.
    pub currency: String,
    /// Hash of the matching transfer, attached whenever one was identified,
    /// regardless of status, to aid operator diagnosis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Block-inclusion time of the matching transfer, when confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<UnixTimestamp>,
    /// Wallet address that was queried.
    pub address: String,
    /// When this verification ran.
    pub verified_at: UnixTimestamp,
    /// Provider that produced the evidence.
    pub provider: String,
}

impl PaymentVerification {
    /// Amount received beyond the expected amount, zero unless overpaid.
    pub fn surplus(&self) -> Decimal {
        if self.received > self.expected {
            self.received - self.expected
        } else {
            Decimal::ZERO
        }
    }

    /// Amount still outstanding, zero once the expected amount arrived.
    pub fn deficit(&self) -> Decimal {
        if self.received < self.expected {
            self.expected - self.received
        } else {
            Decimal::ZERO
        }
    }
}

impl Display for PaymentVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            PaymentStatus::Verified => write!(
                f,
                "Payment verified: {} {} received at {}",
                self.received, self.currency, self.address
            ),
            PaymentStatus::Overpaid => write!(
                f,
                "Payment received with overpayment: expected {} {}, received {} (surplus {})",
                self.expected,
                self.currency,
                self.received,
                self.surplus()
            ),
            PaymentStatus::Partial => write!(
                f,
                "Partial payment: {} of {} {} received, {} outstanding; send the remainder to {}",
                self.received,
                self.expected,
                self.currency,
                self.deficit(),
                self.address
            ),
            PaymentStatus::NotFound => write!(
                f,
                "No payment found: expected {} {} at {}",
                self.expected, self.currency, self.address
            ),
            PaymentStatus::Pending => match &self.tx_hash {
                Some(hash) => write!(
                    f,
                    "Payment pending: transfer {} to {} awaits confirmation",
                    hash, self.address
                ),
                None => write!(f, "Payment pending confirmation at {}", self.address),
            },
        }
    }
}

/// Verification failures: the call could not be performed.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Classifies a balance against the expected amount.
///
/// Pure amount comparison; the pending rule is layered on top by the engine
/// when an unconfirmed matching transfer is present.
pub fn classify(expected: Decimal, received: Decimal) -> PaymentStatus {
    if received == Decimal::ZERO {
        PaymentStatus::NotFound
    } else if received < expected {
        PaymentStatus::Partial
    } else if received == expected {
        PaymentStatus::Verified
    } else {
        PaymentStatus::Overpaid
    }
}

/// Picks the transfer that best explains the expected payment.
///
/// An amount-equal transfer wins (confirmed ones first); otherwise the
/// largest incoming transfer is taken as the closest evidence.
fn best_match(transfers: &[Transaction], expected: Decimal) -> Option<&Transaction> {
    transfers
        .iter()
        .filter(|tx| tx.amount == expected && tx.confirmed)
        .chain(transfers.iter().filter(|tx| tx.amount == expected))
        .next()
        .or_else(|| {
            transfers
                .iter()
                .max_by(|a, b| a.amount.cmp(&b.amount).then(a.block_number.cmp(&b.block_number)))
        })
}

/// Orchestrates resolver and provider into one [`PaymentVerification`].
#[derive(Debug)]
pub struct VerificationEngine<P: Provider> {
    provider: P,
}

impl<P: Provider> VerificationEngine<P> {
    pub fn new(provider: P) -> Self {
        VerificationEngine { provider }
    }

    /// The provider backing this engine.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Verifies whether `expected` has arrived for `invoice` via `method`.
    ///
    /// Resolution failures and provider errors propagate immediately; a
    /// computed outcome, including `NotFound`, is a success.
    pub async fn verify_invoice(
        &self,
        invoice: &Invoice,
        method: PaymentMethod,
        default_addresses: &HashMap<PaymentMethod, String>,
        expected: Decimal,
        cancel: &CancellationToken,
    ) -> Result<PaymentVerification, VerificationError> {
        let address = resolve_address(invoice, method, default_addresses)?;
        let token = method.token().ok_or(ResolveError::NonCryptoMethod { method })?;
        tracing::info!(
            invoice = %invoice.number,
            %method,
            %address,
            provider = self.provider.name(),
            "Verifying payment"
        );
        self.verify_address(&address, token, expected, cancel)
            .await
            .map_err(VerificationError::from)
    }

    /// Verifies `expected` against a wallet address directly.
    pub async fn verify_address(
        &self,
        address: &str,
        token: TokenType,
        expected: Decimal,
        cancel: &CancellationToken,
    ) -> Result<PaymentVerification, ProviderError> {
        let query = TransactionQuery::new(address, token);
        let transfers = self.provider.transactions(&query, cancel).await?;
        let balance = self.provider.balance(address, token, cancel).await?;

        let matched = best_match(&transfers, expected);
        let tx_hash = matched.map(|tx| tx.hash.clone());
        let confirmed_at = matched.filter(|tx| tx.confirmed).map(|tx| tx.timestamp);

        // An unconfirmed matching transfer outranks any balance-derived
        // classification: the balance may already include value that never
        // confirms.
        let status = match matched {
            Some(tx) if !tx.confirmed => PaymentStatus::Pending,
            _ => classify(expected, balance.balance),
        };

        let verification = PaymentVerification {
            status,
            expected,
            received: balance.balance,
            currency: token.code().to_string(),
            tx_hash,
            confirmed_at,
            address: address.to_string(),
            verified_at: UnixTimestamp::now(),
            provider: balance.provider,
        };
        tracing::info!(
            status = %verification.status,
            received = %verification.received,
            expected = %verification.expected,
            "Verification complete"
        );
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::Scenario;
    use crate::provider::{MockProvider, Transaction};
    use std::str::FromStr;

    const WALLET: &str = "0x9aB5fE1239cC79bc8Cd342cF5a6Fd4a1B3E5C7d9";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal")
    }

    fn engine_with_scenario(scenario: Scenario, expected: Decimal) -> VerificationEngine<MockProvider> {
        let provider = MockProvider::new();
        provider.configure_scenario(scenario, WALLET, TokenType::Usdc, expected);
        VerificationEngine::new(provider)
    }

    fn defaults() -> HashMap<PaymentMethod, String> {
        HashMap::from([(PaymentMethod::Usdc, WALLET.to_string())])
    }

    #[test]
    fn classification_covers_every_amount_relation() {
        assert_eq!(classify(dec("100"), dec("100")), PaymentStatus::Verified);
        assert_eq!(classify(dec("100"), dec("150")), PaymentStatus::Overpaid);
        assert_eq!(classify(dec("100"), dec("50")), PaymentStatus::Partial);
        assert_eq!(classify(dec("100"), dec("0")), PaymentStatus::NotFound);
    }

    #[test]
    fn only_verified_and_overpaid_are_successful() {
        assert!(PaymentStatus::Verified.is_successful());
        assert!(PaymentStatus::Overpaid.is_successful());
        assert!(!PaymentStatus::Partial.is_successful());
        assert!(!PaymentStatus::NotFound.is_successful());
        assert!(!PaymentStatus::Pending.is_successful());
    }

    #[tokio::test]
    async fn exact_payment_verifies_with_transfer_evidence() {
        let engine = engine_with_scenario(Scenario::PaymentFound, dec("100.00"));
        let cancel = CancellationToken::new();
        let verification = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await
            .expect("verifies");
        assert_eq!(verification.status, PaymentStatus::Verified);
        assert_eq!(verification.surplus(), Decimal::ZERO);
        assert_eq!(verification.deficit(), Decimal::ZERO);
        assert!(verification.tx_hash.is_some());
        assert!(verification.confirmed_at.is_some());
        assert_eq!(verification.currency, "USDC");
        assert_eq!(verification.provider, "mock");
    }

    #[tokio::test]
    async fn overpayment_reports_exact_surplus() {
        let engine = engine_with_scenario(Scenario::Overpayment, dec("100.00"));
        let cancel = CancellationToken::new();
        let verification = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await
            .expect("verifies");
        assert_eq!(verification.status, PaymentStatus::Overpaid);
        assert_eq!(verification.surplus(), dec("50.00"));
    }

    #[tokio::test]
    async fn partial_payment_reports_exact_deficit() {
        let engine = engine_with_scenario(Scenario::PartialPayment, dec("100.00"));
        let cancel = CancellationToken::new();
        let verification = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await
            .expect("verifies");
        assert_eq!(verification.status, PaymentStatus::Partial);
        assert_eq!(verification.deficit(), dec("50.00"));
    }

    #[tokio::test]
    async fn zero_balance_is_not_found() {
        let engine = engine_with_scenario(Scenario::PaymentNotFound, dec("100.00"));
        let cancel = CancellationToken::new();
        let verification = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await
            .expect("verifies");
        assert_eq!(verification.status, PaymentStatus::NotFound);
        assert_eq!(verification.received, Decimal::ZERO);
    }

    #[tokio::test]
    async fn network_error_fails_the_call_not_the_classification() {
        let engine = engine_with_scenario(Scenario::NetworkError, dec("100.00"));
        let cancel = CancellationToken::new();
        let result = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await;
        match result {
            Err(error) => assert!(error.is_retryable()),
            Ok(verification) => panic!("expected an error, got {:?}", verification.status),
        }
    }

    #[tokio::test]
    async fn unconfirmed_matching_transfer_is_pending_despite_full_balance() {
        let provider = MockProvider::new();
        provider.set_balance(WALLET, TokenType::Usdc, dec("100.00"));
        provider.push_transaction(Transaction {
            hash: "0xpending".to_string(),
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: WALLET.to_string(),
            amount: dec("100.00"),
            token: TokenType::Usdc,
            block_number: 2_000_000,
            timestamp: UnixTimestamp::from_secs(1_700_000_500),
            confirmed: false,
        });
        let engine = VerificationEngine::new(provider);
        let cancel = CancellationToken::new();
        let verification = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await
            .expect("verifies");
        assert_eq!(verification.status, PaymentStatus::Pending);
        assert_eq!(verification.tx_hash.as_deref(), Some("0xpending"));
        assert!(verification.confirmed_at.is_none());
    }

    #[tokio::test]
    async fn confirmed_match_wins_over_unconfirmed_duplicate() {
        let provider = MockProvider::new();
        provider.set_balance(WALLET, TokenType::Usdc, dec("100.00"));
        for (hash, confirmed) in [("0xunconfirmed", false), ("0xconfirmed", true)] {
            provider.push_transaction(Transaction {
                hash: hash.to_string(),
                from: "0x1111111111111111111111111111111111111111".to_string(),
                to: WALLET.to_string(),
                amount: dec("100.00"),
                token: TokenType::Usdc,
                block_number: 2_000_000,
                timestamp: UnixTimestamp::from_secs(1_700_000_500),
                confirmed,
            });
        }
        let engine = VerificationEngine::new(provider);
        let cancel = CancellationToken::new();
        let verification = engine
            .verify_address(WALLET, TokenType::Usdc, dec("100.00"), &cancel)
            .await
            .expect("verifies");
        assert_eq!(verification.status, PaymentStatus::Verified);
        assert_eq!(verification.tx_hash.as_deref(), Some("0xconfirmed"));
    }

    #[tokio::test]
    async fn verify_invoice_resolves_address_first() {
        let engine = engine_with_scenario(Scenario::PaymentFound, dec("100.00"));
        let cancel = CancellationToken::new();
        let invoice = Invoice::sample("INV-001");
        let verification = engine
            .verify_invoice(
                &invoice,
                PaymentMethod::Usdc,
                &defaults(),
                dec("100.00"),
                &cancel,
            )
            .await
            .expect("verifies");
        assert_eq!(verification.address, WALLET);
        assert_eq!(verification.status, PaymentStatus::Verified);
    }

    #[tokio::test]
    async fn verify_invoice_propagates_resolution_failure() {
        let engine = engine_with_scenario(Scenario::PaymentFound, dec("100.00"));
        let cancel = CancellationToken::new();
        let invoice = Invoice::sample("INV-001");
        let result = engine
            .verify_invoice(
                &invoice,
                PaymentMethod::Wire,
                &defaults(),
                dec("100.00"),
                &cancel,
            )
            .await;
        assert!(matches!(
            result,
            Err(VerificationError::Resolve(ResolveError::NonCryptoMethod { .. }))
        ));
    }

    #[test]
    fn summaries_name_amounts_and_address() {
        let mut verification = PaymentVerification {
            status: PaymentStatus::Partial,
            expected: dec("100.00"),
            received: dec("40.00"),
            currency: "USDC".to_string(),
            tx_hash: None,
            confirmed_at: None,
            address: WALLET.to_string(),
            verified_at: UnixTimestamp::from_secs(1_700_000_000),
            provider: "mock".to_string(),
        };
        let summary = verification.to_string();
        assert!(summary.contains("60.00"));
        assert!(summary.contains(WALLET));

        verification.status = PaymentStatus::Overpaid;
        verification.received = dec("150.00");
        assert!(verification.to_string().contains("50.00"));
    }
}
