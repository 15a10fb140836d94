//! stl-reconcile
//!
//! Turns a hub account's raw ledger history into a partner-attributed
//! settlement report.
//!
//! - `extract`: addresses referenced by transaction effect metadata
//! - `normalize`: one raw transaction into a canonical `PaymentRecord`
//! - `engine`: relevance filter, counterparty resolution, ordering
//! - `stats`: per-partner aggregation
//!
//! Everything except [`fetch_and_reconcile`] is pure. The fetch entry point
//! never returns an error: a failed fetch is an empty report.

pub mod engine;
pub mod extract;
pub mod normalize;
pub mod stats;

pub use engine::{reconcile, reconcile_at};
pub use extract::{decode_effects, extract_accounts, LedgerEntryEffect, ADDRESS_FIELDS};
pub use normalize::normalize;

use stl_directory::Directory;
use stl_ledger::{GatewayError, LedgerGateway, LedgerSession, TxQuery};
use stl_schemas::{RawTransaction, SettlementReport};

/// Result of one fetch-and-reconcile pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// History fetched; `history` is what the report was built from.
    Fresh {
        report: SettlementReport,
        history: Vec<RawTransaction>,
    },
    /// History could not be fetched. The report is empty.
    FetchFailed { error: String },
}

impl ReconcileOutcome {
    pub fn report(&self) -> SettlementReport {
        match self {
            ReconcileOutcome::Fresh { report, .. } => report.clone(),
            ReconcileOutcome::FetchFailed { .. } => SettlementReport::empty(),
        }
    }

    pub fn into_report(self) -> SettlementReport {
        match self {
            ReconcileOutcome::Fresh { report, .. } => report,
            ReconcileOutcome::FetchFailed { .. } => SettlementReport::empty(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, ReconcileOutcome::Fresh { .. })
    }
}

/// Fetch up to `limit` entries of the hub's history inside one session.
pub async fn fetch_hub_history<G: LedgerGateway + ?Sized>(
    gateway: &G,
    directory: &Directory,
    limit: u32,
) -> Result<Vec<RawTransaction>, GatewayError> {
    let session = LedgerSession::open(gateway).await?;
    let result = session
        .account_transactions(directory.hub_address(), limit, TxQuery::default())
        .await;
    session.close().await;
    result
}

/// Fetch the hub history and reconcile it for `selected_keys` (empty = all
/// partners).
///
/// Unknown keys and gateway failures are logged and reported as
/// [`ReconcileOutcome::FetchFailed`].
pub async fn fetch_and_reconcile_outcome<G, S>(
    gateway: &G,
    directory: &Directory,
    selected_keys: &[S],
    limit: u32,
) -> ReconcileOutcome
where
    G: LedgerGateway + ?Sized,
    S: AsRef<str>,
{
    let selected = match directory.select(selected_keys) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "partner selection rejected");
            return ReconcileOutcome::FetchFailed {
                error: e.to_string(),
            };
        }
    };

    match fetch_hub_history(gateway, directory, limit).await {
        Ok(history) => {
            let report = reconcile(directory.hub_address(), &history, &selected, directory);
            tracing::info!(
                gateway = gateway.name(),
                history = history.len(),
                payments = report.payments.len(),
                "settlement report built"
            );
            ReconcileOutcome::Fresh { report, history }
        }
        Err(e) => {
            tracing::warn!(
                gateway = gateway.name(),
                hub = %directory.hub_address(),
                error = %e,
                "hub history fetch failed; reporting empty"
            );
            ReconcileOutcome::FetchFailed {
                error: e.to_string(),
            }
        }
    }
}

/// Like [`fetch_and_reconcile_outcome`], reduced to the report.
pub async fn fetch_and_reconcile<G, S>(
    gateway: &G,
    directory: &Directory,
    selected_keys: &[S],
    limit: u32,
) -> SettlementReport
where
    G: LedgerGateway + ?Sized,
    S: AsRef<str>,
{
    fetch_and_reconcile_outcome(gateway, directory, selected_keys, limit)
        .await
        .into_report()
}
