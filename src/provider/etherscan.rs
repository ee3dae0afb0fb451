//! Etherscan-compatible multichain explorer backend.
//!
//! Queries the explorer's v2 HTTP API for ERC-20 token balances and incoming
//! transfers. The upstream cannot filter by timestamp range, so transfer
//! listings are requested broadly and narrowed client-side after unit
//! conversion.
//!
//! Free-tier API keys are throttled upstream at a handful of requests per
//! second; outgoing requests are spaced to stay under that rate, and
//! rate-limit responses surface as retryable errors rather than permanent
//! failures.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::provider::{BalanceResult, Provider, ProviderError, Transaction, TransactionQuery};
use crate::timestamp::UnixTimestamp;
use crate::token::{TokenAmount, TokenType};

/// Provider name recorded on every result.
const PROVIDER_NAME: &str = "etherscan";

/// Environment variable the API key is read from when not passed explicitly.
pub const ENV_API_KEY: &str = "ETHERSCAN_API_KEY";

/// Default explorer endpoint (multichain v2 API).
pub const DEFAULT_BASE_URL: &str = "https://api.etherscan.io/v2/api";

/// Default per-request HTTP timeout, independent of caller cancellation.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum spacing between consecutive requests (free tier: ~5 req/s).
const REQUEST_SPACING: Duration = Duration::from_millis(250);

static SUPPORTED: &[TokenType] = &[TokenType::Usdc];

/// Ethereum network selection.
///
/// The chain identifier and the USDC contract address always change
/// together: a mismatched pair silently returns wrong data upstream, so the
/// two are hardcoded as a single selectable unit rather than independent
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthereumNetwork {
    /// Ethereum mainnet (chain ID 1).
    Mainnet,
    /// Sepolia testnet (chain ID 11155111).
    Sepolia,
}

impl EthereumNetwork {
    /// Selects the network from the CLI `--testnet` flag.
    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            EthereumNetwork::Sepolia
        } else {
            EthereumNetwork::Mainnet
        }
    }

    /// Chain identifier sent as the `chainid` query parameter.
    pub fn chain_id(&self) -> u64 {
        match self {
            EthereumNetwork::Mainnet => 1,
            EthereumNetwork::Sepolia => 11155111,
        }
    }

    /// USDC deployment on this network.
    pub fn usdc_contract(&self) -> &'static str {
        match self {
            EthereumNetwork::Mainnet => "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            EthereumNetwork::Sepolia => "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
        }
    }
}

/// Response envelope shared by every explorer endpoint.
///
/// `status` is `"1"` on success and `"0"` on failure; `result` is a string
/// for balance queries and an array of transfer records for listings, so it
/// stays a raw value until the status has been inspected.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    message: String,
    result: serde_json::Value,
}

/// One ERC-20 transfer record as returned by `action=tokentx`.
///
/// Numeric fields are string-encoded upstream; `value` is an integer string
/// in the token's smallest unit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenTransferRecord {
    block_number: String,
    time_stamp: String,
    hash: String,
    from: String,
    to: String,
    value: String,
    confirmations: String,
}

/// Spaces outgoing requests at least [`REQUEST_SPACING`] apart.
///
/// The mutex is held across the sleep, which also serializes concurrent
/// calls through the same provider instance.
#[derive(Debug)]
struct Throttle {
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    fn new() -> Self {
        Throttle {
            last_request: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < REQUEST_SPACING {
                tokio::time::sleep(REQUEST_SPACING - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// HTTP-backed [`Provider`] over an Etherscan-compatible explorer.
pub struct EtherscanProvider {
    http: reqwest::Client,
    base_url: Url,
    network: EthereumNetwork,
    api_key: Option<String>,
    throttle: Throttle,
}

impl std::fmt::Debug for EtherscanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtherscanProvider")
            .field("base_url", &self.base_url.as_str())
            .field("network", &self.network)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EtherscanProvider {
    /// Creates a provider for `network`.
    ///
    /// `api_key` falls back to the `ETHERSCAN_API_KEY` environment variable;
    /// the explorer accepts keyless requests at a heavily reduced rate, so a
    /// missing key is not an error until the upstream rejects a call.
    pub fn new(
        network: EthereumNetwork,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(network, api_key, DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a provider against a specific endpoint, for alternate
    /// explorer deployments and tests.
    pub fn with_base_url(
        network: EthereumNetwork,
        api_key: Option<String>,
        base_url: &str,
        http_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(ENV_API_KEY).ok().filter(|key| !key.is_empty()));
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Data(format!("invalid explorer URL {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(EtherscanProvider {
            http,
            base_url,
            network,
            api_key,
            throttle: Throttle::new(),
        })
    }

    /// The network this provider queries.
    pub fn network(&self) -> EthereumNetwork {
        self.network
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

    /// Classifies a `status: "0"` reply that is not a benign empty listing.
    ///
    /// The upstream is opaque about key problems: the same failure shape
    /// means "configure a key" without one and "invalid key or throttled"
    /// with one.
    fn classify_failure(&self, message: &str, result: &serde_json::Value) -> ProviderError {
        let detail = result
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(message)
            .to_string();
        if self.api_key.is_none() {
            ProviderError::MissingApiKey {
                provider: PROVIDER_NAME.to_string(),
                env_hint: ENV_API_KEY,
            }
        } else {
            ProviderError::RateLimited(detail)
        }
    }

    /// Issues one throttled GET and returns the parsed envelope.
    ///
    /// Cancellation is checked before dispatch and raced against the
    /// in-flight request; the HTTP client additionally enforces its own
    /// timeout so a hung upstream cannot block past it.
    async fn call(
        &self,
        params: Vec<(&'static str, String)>,
        cancel: &CancellationToken,
    ) -> Result<ApiEnvelope, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let request = async {
            self.throttle.wait().await;
            let mut query = params;
            if let Some(key) = &self.api_key {
                query.push(("apikey", key.clone()));
            }
            let response = self
                .http
                .get(self.base_url.clone())
                .query(&query)
                .send()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(ProviderError::RateLimited(format!("HTTP {status}")));
                }
                return Err(ProviderError::Transport(format!(
                    "HTTP {status} from {PROVIDER_NAME}"
                )));
            }
            response
                .json::<ApiEnvelope>()
                .await
                .map_err(|e| ProviderError::Data(format!("invalid response body: {e}")))
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = request => result,
        }
    }

    fn convert_records(
        &self,
        records: Vec<TokenTransferRecord>,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let mut transfers = Vec::with_capacity(records.len());
        for record in records {
            let amount =
                TokenAmount::parse_base_units(&record.value)?.to_decimal(query.token)?;
            let block_number = record.block_number.parse::<u64>().map_err(|_| {
                ProviderError::Data(format!("unparsable block number: {:?}", record.block_number))
            })?;
            let timestamp = record.time_stamp.parse::<u64>().map_err(|_| {
                ProviderError::Data(format!("unparsable timestamp: {:?}", record.time_stamp))
            })?;
            let confirmations = record.confirmations.parse::<u64>().map_err(|_| {
                ProviderError::Data(format!(
                    "unparsable confirmations: {:?}",
                    record.confirmations
                ))
            })?;
            let transfer = Transaction {
                hash: record.hash,
                from: record.from,
                to: record.to,
                amount,
                token: query.token,
                block_number,
                timestamp: UnixTimestamp::from_secs(timestamp),
                confirmed: confirmations >= 1,
            };
            if query.matches(&transfer) {
                transfers.push(transfer);
            }
        }
        Ok(transfers)
    }
}

/// "No transactions found" is a successful empty listing, not a failure.
fn is_empty_listing(message: &str) -> bool {
    message.to_ascii_lowercase().contains("no transactions found")
}

impl Provider for EtherscanProvider {
    fn balance(
        &self,
        address: &str,
        token: TokenType,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BalanceResult, ProviderError>> + Send {
        async move {
            self.ensure_supported(token)?;
            let params = vec![
                ("chainid", self.network.chain_id().to_string()),
                ("module", "account".to_string()),
                ("action", "tokenbalance".to_string()),
                ("contractaddress", self.network.usdc_contract().to_string()),
                ("address", address.to_string()),
                ("tag", "latest".to_string()),
            ];
            let envelope = self.call(params, cancel).await?;
            if envelope.status != "1" {
                return Err(self.classify_failure(&envelope.message, &envelope.result));
            }
            let raw = envelope.result.as_str().ok_or_else(|| {
                ProviderError::Data(format!(
                    "expected string balance, got: {}",
                    envelope.result
                ))
            })?;
            let balance = TokenAmount::parse_base_units(raw)?.to_decimal(token)?;
            tracing::debug!(%address, %balance, token = %token, "Fetched token balance");
            Ok(BalanceResult {
                address: address.to_string(),
                balance,
                token,
                as_of: UnixTimestamp::now(),
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
            self.ensure_supported(query.token)?;
            let params = vec![
                ("chainid", self.network.chain_id().to_string()),
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("contractaddress", self.network.usdc_contract().to_string()),
                ("address", query.address.clone()),
                ("sort", "asc".to_string()),
            ];
            let envelope = self.call(params, cancel).await?;
            if envelope.status != "1" {
                if is_empty_listing(&envelope.message) {
                    return Ok(Vec::new());
                }
                return Err(self.classify_failure(&envelope.message, &envelope.result));
            }
            let records: Vec<TokenTransferRecord> = serde_json::from_value(envelope.result)
                .map_err(|e| ProviderError::Data(format!("invalid transfer list: {e}")))?;
            let transfers = self.convert_records(records, query)?;
            tracing::debug!(
                address = %query.address,
                count = transfers.len(),
                "Fetched incoming transfers"
            );
            Ok(transfers)
        }
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supported_tokens(&self) -> &[TokenType] {
        SUPPORTED
    }
}
