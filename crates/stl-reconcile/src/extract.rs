//! Metadata account extraction.
//!
//! Each `AffectedNodes` element decodes into a [`LedgerEntryEffect`]. The
//! addresses taken from an effect are exactly those named in
//! [`ADDRESS_FIELDS`], read from the effect's selected field set.
//!
//! Never fails: absent or malformed metadata contributes nothing.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use stl_schemas::LedgerAddress;

/// Where an address may live inside a ledger entry's field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    /// Top-level string field.
    Direct(&'static str),
    /// String sub-field of an object field (trust-line limits).
    Nested(&'static str, &'static str),
}

/// Address policy for affected ledger entries.
pub const ADDRESS_FIELDS: &[AddressField] = &[
    AddressField::Direct("Account"),
    AddressField::Direct("Destination"),
    AddressField::Direct("Owner"),
    AddressField::Nested("LowLimit", "issuer"),
    AddressField::Nested("HighLimit", "issuer"),
    AddressField::Direct("Issuer"),
];

/// Type and selected field set of one affected entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AffectedEntry {
    pub ledger_entry_type: Option<String>,
    /// `FinalFields`, else `NewFields`, else `PreviousFields`.
    pub fields: Map<String, Value>,
}

/// One element of `meta.AffectedNodes`.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntryEffect {
    Created(AffectedEntry),
    Modified(AffectedEntry),
    Deleted(AffectedEntry),
}

impl LedgerEntryEffect {
    pub fn entry(&self) -> &AffectedEntry {
        match self {
            LedgerEntryEffect::Created(e)
            | LedgerEntryEffect::Modified(e)
            | LedgerEntryEffect::Deleted(e) => e,
        }
    }

    /// Values of [`ADDRESS_FIELDS`] that carry the address sigil.
    pub fn addresses(&self) -> impl Iterator<Item = LedgerAddress> + '_ {
        let fields = &self.entry().fields;
        ADDRESS_FIELDS.iter().filter_map(move |f| {
            let v = match *f {
                AddressField::Direct(key) => fields.get(key),
                AddressField::Nested(outer, inner) => fields.get(outer).and_then(|o| o.get(inner)),
            };
            v.and_then(Value::as_str).and_then(LedgerAddress::from_ledger)
        })
    }
}

fn decode_entry(node: &Value) -> AffectedEntry {
    let field_set = ["FinalFields", "NewFields", "PreviousFields"]
        .iter()
        .find_map(|k| node.get(*k).and_then(Value::as_object))
        .cloned()
        .unwrap_or_default();
    AffectedEntry {
        ledger_entry_type: node
            .get("LedgerEntryType")
            .and_then(Value::as_str)
            .map(str::to_string),
        fields: field_set,
    }
}

fn decode_node(node: &Value) -> Option<LedgerEntryEffect> {
    let obj = node.as_object()?;
    if let Some(inner) = obj.get("CreatedNode") {
        Some(LedgerEntryEffect::Created(decode_entry(inner)))
    } else if let Some(inner) = obj.get("ModifiedNode") {
        Some(LedgerEntryEffect::Modified(decode_entry(inner)))
    } else {
        obj.get("DeletedNode")
            .map(|inner| LedgerEntryEffect::Deleted(decode_entry(inner)))
    }
}

/// Decode `meta.AffectedNodes`. Unrecognised elements are skipped.
pub fn decode_effects(meta: &Value) -> Vec<LedgerEntryEffect> {
    meta.get("AffectedNodes")
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter().filter_map(decode_node).collect())
        .unwrap_or_default()
}

/// Every address referenced by the transaction's effects.
pub fn extract_accounts(meta: Option<&Value>) -> BTreeSet<LedgerAddress> {
    let Some(meta) = meta else {
        return BTreeSet::new();
    };
    let effects = decode_effects(meta);
    effects.iter().flat_map(|e| e.addresses()).collect()
}
