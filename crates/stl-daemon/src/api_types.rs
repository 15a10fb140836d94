//! Request and response types for the stl-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stl_schemas::SettlementReport;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Errors (400 / 409 / 503)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/partners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerEntry {
    pub key: String,
    pub display_name: String,
    pub address: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnersResponse {
    pub hub_key: String,
    pub hub_label: String,
    pub hub_address: String,
    pub partners: Vec<PartnerEntry>,
}

// ---------------------------------------------------------------------------
// /v1/report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    /// Comma-separated partner keys. Absent or empty = all partners.
    pub partners: Option<String>,
}

impl ReportQuery {
    pub fn keys(&self) -> Vec<String> {
        self.partners
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    /// Time of the poll this report was built from; `null` if the last poll
    /// failed or none has completed.
    pub fetched_at: Option<String>,
    pub last_error: Option<String>,
    #[serde(flatten)]
    pub report: SettlementReport,
}

// ---------------------------------------------------------------------------
// /v1/balances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub key: String,
    pub label: String,
    pub address: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub balance: Option<Decimal>,
    pub owner_count: Option<u32>,
    pub sequence: Option<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub fetched_at: String,
    pub accounts: Vec<BalanceEntry>,
}
