//! Deterministic, network-free provider for tests and demos.
//!
//! Configuration is explicit: balances, transfers, and injected faults are
//! set directly or through a named [`Scenario`], and [`MockProvider::reset`]
//! clears all of it so tests stay independent. Unknown scenario names fail
//! loudly rather than defaulting silently.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::provider::{BalanceResult, Provider, ProviderError, Transaction, TransactionQuery};
use crate::timestamp::UnixTimestamp;
use crate::token::TokenType;

const PROVIDER_NAME: &str = "mock";

static SUPPORTED: &[TokenType] = &[TokenType::Usdc, TokenType::Bsv];

/// Block details used for scripted transfers; fixed for determinism.
const SCENARIO_BLOCK: u64 = 1_000_000;
const SCENARIO_TIMESTAMP: u64 = 1_700_000_000;

/// Named provider configurations covering the verification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Balance equals the expected amount, one confirmed matching transfer.
    PaymentFound,
    /// Zero balance, no transfers.
    PaymentNotFound,
    /// Balance is 50% of the expected amount.
    PartialPayment,
    /// Balance is 150% of the expected amount.
    Overpayment,
    /// Both balance and transfer calls fail with a fixed transient error.
    NetworkError,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown mock scenario: {0:?}")]
pub struct UnknownScenarioError(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment_found" => Ok(Scenario::PaymentFound),
            "payment_not_found" => Ok(Scenario::PaymentNotFound),
            "partial_payment" => Ok(Scenario::PartialPayment),
            "overpayment" => Ok(Scenario::Overpayment),
            "network_error" => Ok(Scenario::NetworkError),
            other => Err(UnknownScenarioError(other.to_string())),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    balances: HashMap<(String, TokenType), Decimal>,
    transactions: Vec<Transaction>,
    fault: Option<String>,
}

/// Scripted [`Provider`] with interior mutability so tests can share it
/// immutably with the code under test.
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        MockProvider::default()
    }

    /// Sets the balance returned for `address`/`token`.
    pub fn set_balance(&self, address: &str, token: TokenType, balance: Decimal) {
        let mut state = self.state.lock().expect("mock state lock");
        state
            .balances
            .insert((address.to_ascii_lowercase(), token), balance);
    }

    /// Adds a transfer to the scripted history.
    pub fn push_transaction(&self, tx: Transaction) {
        let mut state = self.state.lock().expect("mock state lock");
        state.transactions.push(tx);
    }

    /// Makes every subsequent call fail with a transient transport error.
    pub fn fail_with_transport(&self, message: &str) {
        let mut state = self.state.lock().expect("mock state lock");
        state.fault = Some(message.to_string());
    }

    /// Clears all configured balances, transfers, and injected faults.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("mock state lock");
        *state = MockState::default();
    }

    /// Applies a named [`Scenario`] relative to an expected payment.
    ///
    /// Resets any previous configuration first, so consecutive scenarios do
    /// not leak into each other.
    pub fn configure_scenario(
        &self,
        scenario: Scenario,
        address: &str,
        token: TokenType,
        expected: Decimal,
    ) {
        self.reset();
        match scenario {
            Scenario::PaymentFound => {
                self.set_balance(address, token, expected);
                self.push_transaction(Transaction {
                    hash: "0xm0ck0000000000000000000000000000000001".to_string(),
                    from: "0x1111111111111111111111111111111111111111".to_string(),
                    to: address.to_string(),
                    amount: expected,
                    token,
                    block_number: SCENARIO_BLOCK,
                    timestamp: UnixTimestamp::from_secs(SCENARIO_TIMESTAMP),
                    confirmed: true,
                });
            }
            Scenario::PaymentNotFound => {
                self.set_balance(address, token, Decimal::ZERO);
            }
            Scenario::PartialPayment => {
                self.set_balance(address, token, expected / Decimal::from(2));
            }
            Scenario::Overpayment => {
                let surplus = expected / Decimal::from(2);
                self.set_balance(address, token, expected + surplus);
            }
            Scenario::NetworkError => {
                self.fail_with_transport("mock: connection refused");
            }
        }
    }

    fn check_fault(&self) -> Result<(), ProviderError> {
        let state = self.state.lock().expect("mock state lock");
        match &state.fault {
            Some(message) => Err(ProviderError::Transport(message.clone())),
            None => Ok(()),
        }
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

impl Provider for MockProvider {
    fn balance(
        &self,
        address: &str,
        token: TokenType,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BalanceResult, ProviderError>> + Send {
        async move {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            self.ensure_supported(token)?;
            self.check_fault()?;
            let state = self.state.lock().expect("mock state lock");
            let balance = state
                .balances
                .get(&(address.to_ascii_lowercase(), token))
                .copied()
                .unwrap_or(Decimal::ZERO);
            Ok(BalanceResult {
                address: address.to_string(),
                balance,
                token,
                as_of: UnixTimestamp::from_secs(SCENARIO_TIMESTAMP),
                provider: PROVIDER_NAME.to_string(),
            })
        }
    }

    fn transactions(
        &self,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, ProviderError>> + Send {
        async move {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            self.ensure_supported(query.token)?;
            self.check_fault()?;
            let state = self.state.lock().expect("mock state lock");
            Ok(state
                .transactions
                .iter()
                .filter(|tx| query.matches(tx))
                .cloned()
                .collect())
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

    const WALLET: &str = "0x9aB5fE1239cC79bc8Cd342cF5a6Fd4a1B3E5C7d9";

    fn expected() -> Decimal {
        Decimal::from_str("100.00").expect("decimal")
    }

    #[test]
    fn scenario_names_parse_and_unknown_fails_loudly() {
        assert_eq!(
            Scenario::from_str("payment_found").expect("parses"),
            Scenario::PaymentFound
        );
        assert_eq!(
            Scenario::from_str("network_error").expect("parses"),
            Scenario::NetworkError
        );
        let error = Scenario::from_str("paid_in_full").expect_err("unknown must fail");
        assert!(error.to_string().contains("paid_in_full"));
    }

    #[tokio::test]
    async fn payment_found_scripts_balance_and_transfer() {
        let provider = MockProvider::new();
        provider.configure_scenario(Scenario::PaymentFound, WALLET, TokenType::Usdc, expected());

        let cancel = CancellationToken::new();
        let balance = provider
            .balance(WALLET, TokenType::Usdc, &cancel)
            .await
            .expect("balance");
        assert_eq!(balance.balance, expected());

        let query = TransactionQuery::new(WALLET, TokenType::Usdc);
        let transfers = provider
            .transactions(&query, &cancel)
            .await
            .expect("transfers");
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, expected());
        assert!(transfers[0].confirmed);
    }

    #[tokio::test]
    async fn partial_and_overpayment_scale_the_balance() {
        let provider = MockProvider::new();
        let cancel = CancellationToken::new();

        provider.configure_scenario(
            Scenario::PartialPayment,
            WALLET,
            TokenType::Usdc,
            expected(),
        );
        let balance = provider
            .balance(WALLET, TokenType::Usdc, &cancel)
            .await
            .expect("balance");
        assert_eq!(balance.balance, Decimal::from_str("50.00").expect("decimal"));

        provider.configure_scenario(Scenario::Overpayment, WALLET, TokenType::Usdc, expected());
        let balance = provider
            .balance(WALLET, TokenType::Usdc, &cancel)
            .await
            .expect("balance");
        assert_eq!(
            balance.balance,
            Decimal::from_str("150.00").expect("decimal")
        );
    }

    #[tokio::test]
    async fn network_error_fails_both_calls() {
        let provider = MockProvider::new();
        provider.configure_scenario(Scenario::NetworkError, WALLET, TokenType::Usdc, expected());

        let cancel = CancellationToken::new();
        let balance = provider.balance(WALLET, TokenType::Usdc, &cancel).await;
        assert!(matches!(balance, Err(ProviderError::Transport(_))));

        let query = TransactionQuery::new(WALLET, TokenType::Usdc);
        let transfers = provider.transactions(&query, &cancel).await;
        match transfers {
            Err(error) => assert!(error.is_retryable()),
            Ok(_) => panic!("expected injected transport error"),
        }
    }

    #[tokio::test]
    async fn reset_clears_scripted_state() {
        let provider = MockProvider::new();
        provider.configure_scenario(Scenario::PaymentFound, WALLET, TokenType::Usdc, expected());
        provider.reset();

        let cancel = CancellationToken::new();
        let balance = provider
            .balance(WALLET, TokenType::Usdc, &cancel)
            .await
            .expect("balance");
        assert_eq!(balance.balance, Decimal::ZERO);

        let query = TransactionQuery::new(WALLET, TokenType::Usdc);
        let transfers = provider
            .transactions(&query, &cancel)
            .await
            .expect("transfers");
        assert!(transfers.is_empty());
    }

    #[tokio::test]
    async fn scenarios_do_not_leak_into_each_other() {
        let provider = MockProvider::new();
        provider.configure_scenario(Scenario::NetworkError, WALLET, TokenType::Usdc, expected());
        provider.configure_scenario(
            Scenario::PaymentNotFound,
            WALLET,
            TokenType::Usdc,
            expected(),
        );

        let cancel = CancellationToken::new();
        let balance = provider
            .balance(WALLET, TokenType::Usdc, &cancel)
            .await
            .expect("fault cleared by reconfiguration");
        assert_eq!(balance.balance, Decimal::ZERO);
    }
}
