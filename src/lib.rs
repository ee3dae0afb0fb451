//! Freelancer invoicing with on-chain payment verification.
//!
//! `chainvoice` manages client invoices stored as flat JSON files and
//! answers one hard question about them: has this invoice actually been
//! paid on-chain? Given an invoice's expected amount and a wallet address,
//! it queries a blockchain data provider, converts token-native integer
//! amounts into decimal currency units, and classifies the outcome under
//! real-world ambiguity: partial payments, overpayments, unconfirmed
//! transfers, flaky upstreams.
//!
//! # Modules
//!
//! - [`provider`] — The [`Provider`](provider::Provider) trait with
//!   Etherscan-backed, stubbed BSV, and scripted mock backends.
//! - [`verify`] — The verification engine and its
//!   [`PaymentStatus`](verify::PaymentStatus) classification state machine.
//! - [`resolver`] — Payment methods and wallet address resolution with
//!   override-then-default precedence.
//! - [`invoice`] — The invoice model and the idempotent paid-marking
//!   transition.
//! - [`storage`] — Narrow persistence interface plus the JSON-file store
//!   with versioned updates.
//! - [`token`] — Token definitions and exact base-unit decimal conversion.
//! - [`money`] — Human-readable currency amount parsing.
//! - [`calc`] / [`render`] — Invoice math and HTML rendering collaborators.
//! - [`config`] — JSON configuration with environment fallbacks.
//! - [`cli`] — The `clap` command surface.
//! - [`timestamp`] — Unix timestamp type shared across records.
//!
//! # Outcomes vs. errors
//!
//! A verification that completes with "no payment yet" is a *result*, not an
//! error: [`verify::PaymentStatus`] totals every computed outcome, and only
//! `Verified`/`Overpaid` may mark an invoice paid. Errors mean the
//! verification could not be performed at all: configuration problems
//! surface immediately, transport problems are retryable, and malformed
//! provider data never degrades into a default zero.

pub mod calc;
pub mod cli;
pub mod config;
pub mod invoice;
pub mod money;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod sig_down;
pub mod storage;
pub mod timestamp;
pub mod token;
pub mod verify;
