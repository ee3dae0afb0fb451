//! Configuration for the invoicing CLI.
//!
//! Settings come from a JSON config file; values absent from the file fall
//! back to environment variables, then to hardcoded defaults, during
//! deserialization.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::PaymentMethod;

/// Application configuration.
///
/// # Example
///
/// ```json
/// {
///   "paymentAddresses": {
///     "usdc": "0x9aB5fE1239cC79bc8Cd342cF5a6Fd4a1B3E5C7d9"
///   },
///   "etherscanApiKey": "YourApiKeyToken",
///   "dataDir": "./invoices"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "config_defaults::default_data_dir")]
    data_dir: PathBuf,
    /// Business-level wallet addresses per payment method. Per-invoice
    /// overrides take precedence over these.
    #[serde(default)]
    payment_addresses: HashMap<PaymentMethod, String>,
    #[serde(default = "config_defaults::default_api_key")]
    etherscan_api_key: Option<String>,
    #[serde(default = "config_defaults::default_http_timeout_secs")]
    http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: config_defaults::default_data_dir(),
            payment_addresses: HashMap::new(),
            etherscan_api_key: config_defaults::default_api_key(),
            http_timeout_secs: config_defaults::default_http_timeout_secs(),
        }
    }
}

pub mod config_defaults {
    use std::env;
    use std::path::PathBuf;

    pub const DEFAULT_DATA_DIR: &str = "./invoices";
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

    /// Default data directory with fallback: $CHAINVOICE_DATA_DIR -> "./invoices"
    pub fn default_data_dir() -> PathBuf {
        env::var("CHAINVOICE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// Default API key with fallback: $ETHERSCAN_API_KEY -> none
    pub fn default_api_key() -> Option<String> {
        env::var("ETHERSCAN_API_KEY").ok().filter(|key| !key.is_empty())
    }

    pub fn default_http_timeout_secs() -> u64 {
        DEFAULT_HTTP_TIMEOUT_SECS
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    /// Directory invoices are stored under.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Business-level wallet addresses keyed by payment method.
    pub fn payment_addresses(&self) -> &HashMap<PaymentMethod, String> {
        &self.payment_addresses
    }

    /// Explorer API key, if configured.
    pub fn etherscan_api_key(&self) -> Option<&str> {
        self.etherscan_api_key.as_deref()
    }

    /// Per-request HTTP timeout for provider calls.
    pub fn http_timeout_secs(&self) -> u64 {
        self.http_timeout_secs
    }

    /// Loads configuration.
    ///
    /// An explicitly given path must exist; without one, `./chainvoice.json`
    /// is used if present, and pure env/default configuration otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Path::new("chainvoice.json");
                if default_path.exists() {
                    Self::load_from_path(default_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let json = r#"{
            "dataDir": "/tmp/invoices",
            "paymentAddresses": { "usdc": "0xabc" },
            "etherscanApiKey": "KEY",
            "httpTimeoutSecs": 30
        }"#;
        let config: Config = serde_json::from_str(json).expect("parses");
        assert_eq!(config.data_dir(), Path::new("/tmp/invoices"));
        assert_eq!(
            config.payment_addresses().get(&PaymentMethod::Usdc).map(String::as_str),
            Some("0xabc")
        );
        assert_eq!(config.etherscan_api_key(), Some("KEY"));
        assert_eq!(config.http_timeout_secs(), 30);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parses");
        assert_eq!(config.http_timeout_secs(), 15);
        assert!(config.payment_addresses().is_empty());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.json")));
        assert!(matches!(result, Err(ConfigError::FileRead(..))));
    }
}
