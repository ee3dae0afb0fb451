//! Chainvoice CLI entrypoint.
//!
//! Commands:
//! - `payment verify <invoice> [--method] [--testnet] [--dry-run] [--api-key]`
//!   – verify an invoice's payment on-chain and optionally mark it paid
//! - `invoice list` / `invoice show <number>` / `invoice render <number>`
//!   – read-only surface over the invoice store
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` points at the JSON configuration file
//! - `ETHERSCAN_API_KEY` supplies the explorer API key
//! - `CHAINVOICE_DATA_DIR` overrides the invoice directory
//! - `RUST_LOG` controls log verbosity

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use chainvoice::cli::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}
