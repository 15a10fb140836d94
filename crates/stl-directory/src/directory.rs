//! Participant Directory: the hub plus the partners it settles with.
//!
//! Pure data. Built once at startup and never mutated.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use stl_schemas::LedgerAddress;

/// A settlement partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Stable identifier used in selections (e.g. `"paypay"`).
    pub key: String,
    pub display_name: String,
    pub address: LedgerAddress,
    pub category: String,
}

/// The distinguished account whose history is reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hub {
    pub key: String,
    pub label: String,
    pub address: LedgerAddress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    NoPartners,
    EmptyDisplayName { key: String },
    DuplicateAddress {
        address: String,
        first: String,
        second: String,
    },
    HubIsPartner { key: String },
    UnknownPartner { key: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::NoPartners => write!(f, "directory has no partners"),
            DirectoryError::EmptyDisplayName { key } => {
                write!(f, "partner '{key}' has an empty display_name")
            }
            DirectoryError::DuplicateAddress {
                address,
                first,
                second,
            } => write!(
                f,
                "partners '{first}' and '{second}' share address {address}"
            ),
            DirectoryError::HubIsPartner { key } => {
                write!(f, "partner '{key}' uses the hub address")
            }
            DirectoryError::UnknownPartner { key } => write!(f, "unknown partner key '{key}'"),
        }
    }
}

impl std::error::Error for DirectoryError {}

#[derive(Debug, Clone)]
pub struct Directory {
    hub: Hub,
    /// Sorted by key.
    partners: Vec<Participant>,
    by_address: BTreeMap<LedgerAddress, usize>,
}

impl Directory {
    pub fn new(hub: Hub, mut partners: Vec<Participant>) -> Result<Self, DirectoryError> {
        if partners.is_empty() {
            return Err(DirectoryError::NoPartners);
        }
        partners.sort_by(|a, b| a.key.cmp(&b.key));

        let mut by_address = BTreeMap::new();
        for (idx, p) in partners.iter().enumerate() {
            if p.display_name.trim().is_empty() {
                return Err(DirectoryError::EmptyDisplayName { key: p.key.clone() });
            }
            if p.address == hub.address {
                return Err(DirectoryError::HubIsPartner { key: p.key.clone() });
            }
            if let Some(prev) = by_address.insert(p.address.clone(), idx) {
                return Err(DirectoryError::DuplicateAddress {
                    address: p.address.to_string(),
                    first: partners[prev].key.clone(),
                    second: p.key.clone(),
                });
            }
        }

        Ok(Self {
            hub,
            partners,
            by_address,
        })
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn hub_address(&self) -> &LedgerAddress {
        &self.hub.address
    }

    pub fn partners(&self) -> &[Participant] {
        &self.partners
    }

    pub fn partner(&self, key: &str) -> Option<&Participant> {
        self.partners.iter().find(|p| p.key == key)
    }

    pub fn by_address(&self, address: &str) -> Option<&Participant> {
        let key = LedgerAddress::from_ledger(address)?;
        self.by_address.get(&key).map(|&i| &self.partners[i])
    }

    pub fn display_name_for(&self, address: &str) -> Option<&str> {
        self.by_address(address).map(|p| p.display_name.as_str())
    }

    /// Resolve a key selection. An empty selection means every partner.
    /// Duplicate keys collapse to their first occurrence.
    pub fn select<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<&Participant>, DirectoryError> {
        if keys.is_empty() {
            return Ok(self.partners.iter().collect());
        }
        let mut out: Vec<&Participant> = Vec::with_capacity(keys.len());
        for k in keys {
            let k = k.as_ref().trim();
            let p = self
                .partner(k)
                .ok_or_else(|| DirectoryError::UnknownPartner { key: k.to_string() })?;
            if !out.iter().any(|q| q.key == p.key) {
                out.push(p);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> LedgerAddress {
        LedgerAddress::parse(s).unwrap()
    }

    fn hub() -> Hub {
        Hub {
            key: "toss_main".to_string(),
            label: "TOSS".to_string(),
            address: addr("rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe"),
        }
    }

    fn partner(key: &str, name: &str, a: &str) -> Participant {
        Participant {
            key: key.to_string(),
            display_name: name.to_string(),
            address: addr(a),
            category: "bank".to_string(),
        }
    }

    #[test]
    fn lookups_by_key_and_address() {
        let d = Directory::new(
            hub(),
            vec![
                partner("paypay", "PG", "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"),
                partner("bank_a", "Bank A", "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
            ],
        )
        .unwrap();

        assert_eq!(d.partners()[0].key, "bank_a", "partners are key-sorted");
        assert_eq!(
            d.display_name_for("r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"),
            Some("PG")
        );
        assert_eq!(d.display_name_for("rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe"), None);
        assert_eq!(d.display_name_for("not-an-address"), None);
        assert_eq!(d.partner("bank_a").unwrap().display_name, "Bank A");
    }

    #[test]
    fn empty_selection_means_all() {
        let d = Directory::new(
            hub(),
            vec![
                partner("paypay", "PG", "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"),
                partner("bank_a", "Bank A", "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
            ],
        )
        .unwrap();
        let none: [&str; 0] = [];
        assert_eq!(d.select(&none).unwrap().len(), 2);
        let one = d.select(&["paypay", "paypay"]).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(
            d.select(&["nope"]).unwrap_err(),
            DirectoryError::UnknownPartner {
                key: "nope".to_string()
            }
        );
    }

    #[test]
    fn rejects_duplicate_addresses_and_hub_reuse() {
        let dup = Directory::new(
            hub(),
            vec![
                partner("a", "A", "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"),
                partner("b", "B", "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"),
            ],
        );
        assert!(matches!(dup, Err(DirectoryError::DuplicateAddress { .. })));

        let hub_reuse = Directory::new(
            hub(),
            vec![partner("a", "A", "rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe")],
        );
        assert_eq!(
            hub_reuse.unwrap_err(),
            DirectoryError::HubIsPartner {
                key: "a".to_string()
            }
        );

        assert_eq!(
            Directory::new(hub(), vec![]).unwrap_err(),
            DirectoryError::NoPartners
        );
    }
}
