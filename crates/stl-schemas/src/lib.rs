//! stl-schemas
//!
//! Shared data model for the settlement workspace: ledger addresses, the raw
//! transaction view handed out by the gateway, and the report types produced
//! by reconciliation. No IO.

pub mod address;
pub mod amount;
pub mod raw;

pub use address::{AddressError, LedgerAddress};
pub use amount::{LedgerAmount, NATIVE_CURRENCY};
pub use raw::{RawTransaction, SUCCESS_RESULT};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome classification of one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Success,
    Failed,
    /// No outcome metadata was attached.
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Pending => "pending",
        }
    }
}

/// Canonical payment as derived from one ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
    pub from: String,
    pub to: String,
    /// Major units, two decimal places, never negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    /// Partner display name, or [`UNKNOWN_PARTNER`].
    pub partner: String,
    pub tx_hash: String,
}

/// Label for payments whose counterparty is not in the directory.
pub const UNKNOWN_PARTNER: &str = "Unknown Partner";

/// Per-partner aggregate over a set of [`PaymentRecord`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerStats {
    pub partner: String,
    pub total_transactions: u64,
    pub successful_transactions: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Mean over successful payments only.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_amount: Decimal,
    /// Percentage in `[0, 100]`, one decimal place.
    #[serde(with = "rust_decimal::serde::float")]
    pub success_rate: Decimal,
}

/// Reconciliation output consumed by presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementReport {
    pub payments: Vec<PaymentRecord>,
    pub stats: Vec<PartnerStats>,
}

impl SettlementReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty() && self.stats.is_empty()
    }
}

/// Account metadata as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: LedgerAddress,
    /// Native balance in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    /// Native balance in drops, as reported.
    pub balance_drops: String,
    pub owner_count: u32,
    pub sequence: u32,
}
