//! Transaction classifier and normalizer.
//!
//! `normalize` is total over [`RawTransaction`]: every missing or malformed
//! optional field has a documented default, so one odd record never aborts
//! a report.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use stl_schemas::amount::{is_saturated, round_2dp};
use stl_schemas::{
    LedgerAmount, PaymentRecord, PaymentStatus, RawTransaction, NATIVE_CURRENCY, SUCCESS_RESULT,
};
use uuid::Uuid;

/// Seconds between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z).
pub const LEDGER_EPOCH_OFFSET_SECS: i64 = 946_684_800;

/// Prefix of ids synthesized for entries without a hash.
pub const SYNTHETIC_ID_PREFIX: &str = "tx_";

pub fn classify_status(raw: &RawTransaction) -> PaymentStatus {
    match raw.result_code() {
        None => PaymentStatus::Pending,
        Some(SUCCESS_RESULT) => PaymentStatus::Success,
        Some(_) => PaymentStatus::Failed,
    }
}

/// Delivered amount override, else the nominal `Amount`.
pub fn resolve_amount(raw: &RawTransaction) -> Option<LedgerAmount> {
    raw.delivered_amount()
        .or(raw.amount.as_ref())
        .and_then(LedgerAmount::from_json)
}

/// Major-unit amount rounded to 2 dp. Unparsable and negative values are 0;
/// values above the decimal range are `Decimal::MAX`.
pub fn amount_value(amount: Option<&LedgerAmount>) -> Decimal {
    let v = amount
        .and_then(LedgerAmount::major_units)
        .unwrap_or(Decimal::ZERO);
    round_2dp(v.max(Decimal::ZERO))
}

/// Ledger close time as UTC, if `date` is present and in range.
pub fn ledger_time(raw: &RawTransaction) -> Option<DateTime<Utc>> {
    let secs = raw.date?.checked_add(LEDGER_EPOCH_OFFSET_SECS)?;
    DateTime::<Utc>::from_timestamp_millis(secs.checked_mul(1000)?)
}

pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn synthetic_id(raw: &RawTransaction) -> String {
    // Same entry, same id: the UUID is derived from the entry's JSON form.
    let bytes = serde_json::to_vec(raw).unwrap_or_default();
    format!(
        "{SYNTHETIC_ID_PREFIX}{}",
        Uuid::new_v5(&Uuid::NAMESPACE_OID, &bytes).simple()
    )
}

/// Normalize with an explicit fallback clock. Returns the time used for the
/// record so callers can order without re-parsing.
pub fn normalize_at(
    raw: &RawTransaction,
    partner: &str,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, PaymentRecord) {
    let amount = resolve_amount(raw);
    let at = ledger_time(raw).unwrap_or(now);

    let (id, tx_hash) = match raw.hash.as_deref().filter(|h| !h.is_empty()) {
        Some(h) => (h.to_string(), h.to_string()),
        None => (synthetic_id(raw), String::new()),
    };

    let value = amount_value(amount.as_ref());
    if is_saturated(value) {
        tracing::warn!(
            tx_hash = %tx_hash,
            amount = ?amount,
            "amount out of decimal range; clamped to maximum"
        );
    }

    let record = PaymentRecord {
        id,
        timestamp: format_timestamp(at),
        from: raw.account.clone().unwrap_or_default(),
        to: raw.destination.clone().unwrap_or_default(),
        amount: value,
        currency: amount
            .as_ref()
            .map_or(NATIVE_CURRENCY, LedgerAmount::currency)
            .to_string(),
        status: classify_status(raw),
        partner: partner.to_string(),
        tx_hash,
    };
    (at, record)
}

/// Canonical payment for one raw transaction, tagged with `partner`.
/// Entries without a `date` are stamped with the current time.
pub fn normalize(raw: &RawTransaction, partner: &str) -> PaymentRecord {
    normalize_at(raw, partner, Utc::now()).1
}
