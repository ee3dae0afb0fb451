//! Command-line surface.
//!
//! `payment verify` is the command this crate exists for; the `invoice`
//! subcommands are a thin read-only surface over the store. Human-readable
//! verification summaries derive directly from
//! [`PaymentVerification`](crate::verify::PaymentVerification)'s `Display`.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::calc::{Calculator, StandardCalculator};
use crate::config::Config;
use crate::invoice::{MarkPaidOutcome, mark_paid};
use crate::money::MoneyAmount;
use crate::provider::etherscan::EthereumNetwork;
use crate::provider::{BsvProvider, EtherscanProvider, PaymentProvider, Provider};
use crate::render::{HtmlRenderer, Renderer};
use crate::resolver::{PaymentMethod, ResolveError};
use crate::sig_down::SigDown;
use crate::storage::{InvoiceStore, JsonFileStore};
use crate::verify::VerificationEngine;

/// Freelancer invoicing with on-chain payment verification.
#[derive(Parser, Debug)]
#[command(name = "chainvoice", version, about)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Payment operations
    #[command(subcommand)]
    Payment(PaymentCommand),
    /// Invoice operations
    #[command(subcommand)]
    Invoice(InvoiceCommand),
}

#[derive(Subcommand, Debug)]
pub enum PaymentCommand {
    /// Verify whether an invoice has been paid on-chain
    Verify(VerifyArgs),
    /// List provider backends and the tokens they answer for
    Providers,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Invoice number to verify payment for
    pub invoice: String,

    /// Payment method to verify against
    #[arg(long, default_value = "usdc")]
    pub method: PaymentMethod,

    /// Query the testnet deployment instead of mainnet
    #[arg(long)]
    pub testnet: bool,

    /// Run the full verification without marking the invoice paid
    #[arg(long)]
    pub dry_run: bool,

    /// Explorer API key
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    pub api_key: Option<String>,

    /// Verify against this amount instead of the invoice total
    /// (e.g. "100.50" or "$1,250")
    #[arg(long)]
    pub expected: Option<MoneyAmount>,
}

#[derive(Subcommand, Debug)]
pub enum InvoiceCommand {
    /// List all stored invoices
    List,
    /// Show one invoice with its totals
    Show {
        /// Invoice number
        number: String,
    },
    /// Render an invoice to HTML
    Render {
        /// Invoice number
        number: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Dispatches a parsed command line.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config.as_deref())?;
    let store = JsonFileStore::new(config.data_dir());
    match cli.command {
        Command::Payment(PaymentCommand::Verify(args)) => {
            verify_payment(args, &config, &store).await
        }
        Command::Payment(PaymentCommand::Providers) => list_providers(&config),
        Command::Invoice(command) => invoice_command(command, &store),
    }
}

/// Builds the provider backend for a payment method.
///
/// Selection happens here, at construction time; the engine stays
/// polymorphic over [`crate::provider::Provider`].
fn provider_for(
    method: PaymentMethod,
    testnet: bool,
    api_key: Option<String>,
    config: &Config,
) -> Result<PaymentProvider, Box<dyn std::error::Error>> {
    let token = method
        .token()
        .ok_or(ResolveError::NonCryptoMethod { method })?;
    let provider = match token {
        crate::token::TokenType::Usdc => {
            let network = EthereumNetwork::from_testnet_flag(testnet);
            let api_key = api_key.or_else(|| config.etherscan_api_key().map(str::to_string));
            let timeout = Duration::from_secs(config.http_timeout_secs());
            EtherscanProvider::with_base_url(
                network,
                api_key,
                crate::provider::etherscan::DEFAULT_BASE_URL,
                timeout,
            )?
            .into()
        }
        crate::token::TokenType::Bsv => BsvProvider::new().into(),
    };
    Ok(provider)
}

async fn verify_payment(
    args: VerifyArgs,
    config: &Config,
    store: &JsonFileStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let invoice = store.load(&args.invoice)?;
    let expected = match &args.expected {
        Some(amount) => amount.amount(),
        None => StandardCalculator.total(&invoice),
    };

    let provider = provider_for(args.method, args.testnet, args.api_key.clone(), config)?;
    let engine = VerificationEngine::new(provider);

    let sig_down = SigDown::try_new()?;
    let cancel = sig_down.cancellation_token();

    let verification = engine
        .verify_invoice(
            &invoice,
            args.method,
            config.payment_addresses(),
            expected,
            &cancel,
        )
        .await?;

    println!("{verification}");
    println!(
        "  provider: {}, checked at: {}",
        verification.provider, verification.verified_at
    );

    if !verification.status.is_successful() {
        return Ok(());
    }
    if args.dry_run {
        println!("Dry run: invoice state left unchanged.");
        return Ok(());
    }
    match mark_paid(store, &invoice.number, &verification)? {
        MarkPaidOutcome::Applied => println!("Invoice {} marked paid.", invoice.number),
        MarkPaidOutcome::AlreadyPaid => {
            println!("Invoice {} was already paid; nothing changed.", invoice.number)
        }
    }
    Ok(())
}

/// Prints each backend with its supported tokens, flagging declared tokens
/// whose data source is not wired up yet.
fn list_providers(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let providers: Vec<PaymentProvider> = vec![
        provider_for(PaymentMethod::Usdc, false, None, config)?,
        BsvProvider::new().into(),
    ];
    for provider in &providers {
        let tokens: Vec<&str> = provider
            .supported_tokens()
            .iter()
            .map(|token| token.code())
            .collect();
        let note = match provider {
            PaymentProvider::Bsv(_) => " (declared, not implemented yet)",
            _ => "",
        };
        println!("{}: {}{}", provider.name(), tokens.join(", "), note);
    }
    Ok(())
}

fn invoice_command(
    command: InvoiceCommand,
    store: &JsonFileStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let calc = StandardCalculator;
    match command {
        InvoiceCommand::List => {
            for invoice in store.list()? {
                println!(
                    "{}\t{}\t{} {}\t{:?}",
                    invoice.number,
                    invoice.client,
                    calc.total(&invoice),
                    invoice.currency,
                    invoice.status
                );
            }
        }
        InvoiceCommand::Show { number } => {
            let invoice = store.load(&number)?;
            println!("Invoice {} for {}", invoice.number, invoice.client);
            for item in &invoice.line_items {
                println!(
                    "  {} × {} @ {} = {}",
                    item.description,
                    item.quantity,
                    item.unit_price,
                    item.quantity * item.unit_price
                );
            }
            println!("  Subtotal: {} {}", calc.subtotal(&invoice), invoice.currency);
            println!("  Tax:      {} {}", calc.tax(&invoice), invoice.currency);
            println!("  Total:    {} {}", calc.total(&invoice), invoice.currency);
            if let Some(evidence) = &invoice.payment_evidence {
                println!(
                    "  Paid: {} {} via {} (tx {})",
                    evidence.received,
                    evidence.currency,
                    evidence.provider,
                    evidence.tx_hash.as_deref().unwrap_or("n/a")
                );
            }
        }
        InvoiceCommand::Render { number, out } => {
            let invoice = store.load(&number)?;
            let html = HtmlRenderer::new(calc).render(&invoice);
            match out {
                Some(path) => fs::write(&path, html)?,
                None => print!("{html}"),
            }
        }
    }
    Ok(())
}
