//! Lenient view over one `account_tx` history entry.
//!
//! The ledger has shipped several envelope shapes over time:
//! - API v1: `{ "tx": { ...fields, "hash": .. }, "meta": { .. }, "validated": true }`
//! - API v2: `{ "tx_json": { ...fields }, "hash": "..", "meta": { .. } }`
//! - flat:   `{ ...fields, "hash": .., "meta": { .. } }`
//!
//! Every field is optional. A field carrying the wrong JSON type is treated
//! as absent so one odd record cannot poison a whole history.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome code the ledger uses for an applied, successful transaction.
pub const SUCCESS_RESULT: &str = "tesSUCCESS";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    pub hash: Option<String>,
    pub transaction_type: Option<String>,
    /// Sender (`Account`).
    pub account: Option<String>,
    /// Receiver (`Destination`), absent for non-payment types.
    pub destination: Option<String>,
    /// Nominal `Amount`, undecoded.
    pub amount: Option<Value>,
    /// Ledger close time in seconds since the ledger epoch (2000-01-01).
    pub date: Option<i64>,
    /// Effect metadata, undecoded.
    pub meta: Option<Value>,
    pub validated: Option<bool>,
}

impl RawTransaction {
    /// Decode one history entry. Returns `None` only when `entry` is not a
    /// JSON object at all.
    pub fn from_entry(entry: &Value) -> Option<Self> {
        let outer = entry.as_object()?;

        let tx = outer
            .get("tx_json")
            .or_else(|| outer.get("tx"))
            .and_then(Value::as_object)
            .unwrap_or(outer);

        let str_field = |key: &str| tx.get(key).and_then(Value::as_str).map(str::to_string);

        let hash = outer
            .get("hash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| str_field("hash"));

        let meta = outer
            .get("meta")
            .or_else(|| tx.get("meta"))
            .filter(|m| m.is_object())
            .cloned();

        Some(Self {
            hash,
            transaction_type: str_field("TransactionType"),
            account: str_field("Account"),
            destination: str_field("Destination"),
            amount: tx
                .get("Amount")
                .or_else(|| tx.get("DeliverMax"))
                .filter(|v| !v.is_null())
                .cloned(),
            date: tx.get("date").and_then(Value::as_i64),
            meta,
            validated: outer.get("validated").and_then(Value::as_bool),
        })
    }

    /// `meta.TransactionResult`, if any.
    pub fn result_code(&self) -> Option<&str> {
        self.meta
            .as_ref()?
            .get("TransactionResult")
            .and_then(Value::as_str)
    }

    /// Delivered-amount override: new-style `delivered_amount`, then the
    /// legacy `DeliveredAmount`.
    pub fn delivered_amount(&self) -> Option<&Value> {
        let meta = self.meta.as_ref()?;
        meta.get("delivered_amount")
            .filter(|v| !v.is_null())
            .or_else(|| meta.get("DeliveredAmount").filter(|v| !v.is_null()))
    }
}
