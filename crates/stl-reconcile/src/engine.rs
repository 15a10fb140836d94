use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use stl_directory::{Directory, Participant};
use stl_schemas::{
    LedgerAddress, PaymentRecord, RawTransaction, SettlementReport, UNKNOWN_PARTNER,
};

use crate::extract::extract_accounts;
use crate::normalize::normalize_at;
use crate::stats::aggregate;

/// Addresses a transaction touches: `Account`, `Destination` and every
/// metadata address. Empty fields are dropped.
pub fn involved_addresses(raw: &RawTransaction) -> BTreeSet<LedgerAddress> {
    let mut out = extract_accounts(raw.meta.as_ref());
    for a in [raw.account.as_deref(), raw.destination.as_deref()]
        .into_iter()
        .flatten()
    {
        if let Some(addr) = LedgerAddress::from_ledger(a) {
            out.insert(addr);
        }
    }
    out
}

/// Counterparty of a hub transaction.
///
/// When the hub is the nominal sender (receiver), the nominal receiver
/// (sender) is the counterparty, known or not. Otherwise the first metadata
/// address in the candidate set is used.
pub fn resolve_counterparty(
    raw: &RawTransaction,
    hub: &LedgerAddress,
    candidates: &BTreeSet<&LedgerAddress>,
) -> Option<LedgerAddress> {
    let account = raw.account.as_deref().filter(|a| !a.is_empty());
    let destination = raw.destination.as_deref().filter(|d| !d.is_empty());

    match (account, destination) {
        (Some(a), Some(d)) if *hub == a && *hub != d => return LedgerAddress::from_ledger(d),
        (Some(a), Some(d)) if *hub == d && *hub != a => return LedgerAddress::from_ledger(a),
        _ => {}
    }

    extract_accounts(raw.meta.as_ref())
        .into_iter()
        .find(|a| candidates.contains(a))
}

/// Reconcile a hub history against a partner selection.
///
/// An empty `selected` means every directory partner. Pure apart from the
/// wall-clock fallback for entries without a `date`.
pub fn reconcile(
    hub: &LedgerAddress,
    history: &[RawTransaction],
    selected: &[&Participant],
    directory: &Directory,
) -> SettlementReport {
    reconcile_at(hub, history, selected, directory, Utc::now())
}

/// [`reconcile`] with an explicit fallback clock.
pub fn reconcile_at(
    hub: &LedgerAddress,
    history: &[RawTransaction],
    selected: &[&Participant],
    directory: &Directory,
    now: DateTime<Utc>,
) -> SettlementReport {
    // Stats follow directory key order whatever order the caller selected in.
    let mut selection: Vec<&Participant> = if selected.is_empty() {
        directory.partners().iter().collect()
    } else {
        selected.to_vec()
    };
    selection.sort_by(|a, b| a.key.cmp(&b.key));
    selection.dedup_by(|a, b| a.key == b.key);
    let candidates: BTreeSet<&LedgerAddress> = selection.iter().map(|p| &p.address).collect();

    let mut dated: Vec<(DateTime<Utc>, PaymentRecord)> = Vec::new();
    for raw in history {
        let involved = involved_addresses(raw);
        if !involved.contains(hub) || !involved.iter().any(|a| candidates.contains(a)) {
            continue;
        }

        let partner = resolve_counterparty(raw, hub, &candidates)
            .and_then(|a| directory.display_name_for(a.as_str()))
            .unwrap_or(UNKNOWN_PARTNER);
        dated.push(normalize_at(raw, partner, now));
    }

    // Stable: equal timestamps keep history order.
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    let payments: Vec<PaymentRecord> = dated.into_iter().map(|(_, r)| r).collect();

    let labels: Vec<&str> = selection.iter().map(|p| p.display_name.as_str()).collect();
    let stats = aggregate(&labels, &payments);

    tracing::debug!(
        history = history.len(),
        relevant = payments.len(),
        partners = stats.len(),
        "reconciled hub history"
    );

    SettlementReport { payments, stats }
}
