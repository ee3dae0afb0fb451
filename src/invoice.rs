//! Invoice model and the paid-marking transition.
//!
//! Invoices are plain serde structs persisted by the storage collaborator.
//! The one piece of real logic here is [`mark_paid`]: applying a successful
//! verification to invoice state exactly once, with the storage layer's
//! version check guarding against racing writers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::resolver::PaymentMethod;
use crate::storage::{InvoiceStore, StorageError};
use crate::timestamp::UnixTimestamp;
use crate::verify::{PaymentStatus, PaymentVerification};

/// Invoice lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
}

/// One billable line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// On-chain evidence persisted onto an invoice when it is marked paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvidence {
    /// Hash of the matching transfer, when one was identified.
    pub tx_hash: Option<String>,
    /// Amount the invoice expected.
    pub expected: Decimal,
    /// Amount observed at the wallet address.
    pub received: Decimal,
    /// Currency code both amounts are denominated in.
    pub currency: String,
    /// Wallet address the payment arrived at.
    pub address: String,
    /// Provider that produced the evidence.
    pub provider: String,
    /// When the verification ran.
    pub verified_at: UnixTimestamp,
    /// Block-inclusion time of the matching transfer, when confirmed.
    pub confirmed_at: Option<UnixTimestamp>,
}

/// A client invoice.
///
/// `version` is an optimistic-concurrency counter owned by the storage
/// layer; see [`crate::storage::InvoiceStore::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Invoice number, unique per business (e.g. `INV-2026-014`).
    pub number: String,
    /// Client the invoice is billed to.
    pub client: String,
    /// Currency the line items are denominated in.
    pub currency: String,
    pub line_items: Vec<LineItem>,
    /// Tax rate as a fraction (e.g. `0.19`).
    pub tax_rate: Decimal,
    pub issued_at: UnixTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<UnixTimestamp>,
    pub status: InvoiceStatus,
    /// Per-invoice wallet address overrides, keyed by payment method.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub payment_addresses: HashMap<PaymentMethod, String>,
    /// Evidence of the payment that settled this invoice, once paid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_evidence: Option<PaymentEvidence>,
    /// Storage version for optimistic concurrency.
    #[serde(default)]
    pub version: u64,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    #[cfg(test)]
    pub(crate) fn sample(number: &str) -> Self {
        Invoice {
            number: number.to_string(),
            client: "ACME GmbH".to_string(),
            currency: "USD".to_string(),
            line_items: vec![LineItem {
                description: "Consulting".to_string(),
                quantity: Decimal::from(10),
                unit_price: Decimal::from(10),
            }],
            tax_rate: Decimal::ZERO,
            issued_at: UnixTimestamp::from_secs(1_700_000_000),
            due_at: None,
            status: InvoiceStatus::Sent,
            payment_addresses: HashMap::new(),
            payment_evidence: None,
            version: 0,
        }
    }
}

/// What [`mark_paid`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaidOutcome {
    /// The invoice transitioned to paid and the evidence was persisted.
    Applied,
    /// The invoice was already paid; nothing was written and no side
    /// effects fired.
    AlreadyPaid,
}

#[derive(Debug, thiserror::Error)]
pub enum MarkPaidError {
    /// Only successful verification outcomes may mark an invoice paid.
    #[error("Verification outcome {0:?} is not eligible to mark an invoice paid")]
    NotEligible(PaymentStatus),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Applies a successful verification to invoice state, idempotently.
///
/// Already-paid invoices are left untouched: the transition must not
/// re-fire side effects or rewrite storage. Otherwise the verification
/// evidence is persisted and the status moves to paid in a single versioned
/// update; a concurrent writer loses with
/// [`StorageError::VersionConflict`], so the transition cannot apply twice
/// even across racing verification calls.
pub fn mark_paid<S: InvoiceStore>(
    store: &S,
    number: &str,
    verification: &PaymentVerification,
) -> Result<MarkPaidOutcome, MarkPaidError> {
    if !verification.status.is_successful() {
        return Err(MarkPaidError::NotEligible(verification.status));
    }

    let invoice = store.load(number)?;
    if invoice.is_paid() {
        tracing::debug!(%number, "Invoice already paid, skipping transition");
        return Ok(MarkPaidOutcome::AlreadyPaid);
    }

    let evidence = PaymentEvidence {
        tx_hash: verification.tx_hash.clone(),
        expected: verification.expected,
        received: verification.received,
        currency: verification.currency.clone(),
        address: verification.address.clone(),
        provider: verification.provider.clone(),
        verified_at: verification.verified_at,
        confirmed_at: verification.confirmed_at,
    };

    store.update(number, invoice.version, |invoice| {
        invoice.status = InvoiceStatus::Paid;
        invoice.payment_evidence = Some(evidence);
    })?;
    tracing::info!(%number, "Invoice marked paid");
    Ok(MarkPaidOutcome::Applied)
}
