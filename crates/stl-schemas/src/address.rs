//! Ledger account addresses.
//!
//! Classic addresses are base58 strings using the ledger's own alphabet and
//! always begin with the `r` sigil. Full checksum verification is the
//! ledger's job; this type only rejects values that cannot be an address.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The network's address sigil.
pub const ADDRESS_SIGIL: char = 'r';

/// Base58 alphabet used by the ledger (differs from the Bitcoin ordering).
pub const LEDGER_BASE58_ALPHABET: &str =
    "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

const MIN_LEN: usize = 25;
const MAX_LEN: usize = 35;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    Empty,
    MissingSigil { raw: String },
    BadLength { raw: String, len: usize },
    BadCharacter { raw: String, ch: char },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Empty => write!(f, "ledger address is empty"),
            AddressError::MissingSigil { raw } => {
                write!(f, "ledger address '{raw}' does not start with '{ADDRESS_SIGIL}'")
            }
            AddressError::BadLength { raw, len } => write!(
                f,
                "ledger address '{raw}' has length {len}, expected {MIN_LEN}..={MAX_LEN}"
            ),
            AddressError::BadCharacter { raw, ch } => {
                write!(f, "ledger address '{raw}' contains non-base58 character '{ch}'")
            }
        }
    }
}

impl std::error::Error for AddressError {}

/// A syntactically valid classic ledger address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAddress(String);

impl LedgerAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if !s.starts_with(ADDRESS_SIGIL) {
            return Err(AddressError::MissingSigil { raw: s.to_string() });
        }
        let len = s.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(AddressError::BadLength {
                raw: s.to_string(),
                len,
            });
        }
        if let Some(ch) = s.chars().find(|c| !LEDGER_BASE58_ALPHABET.contains(*c)) {
            return Err(AddressError::BadCharacter {
                raw: s.to_string(),
                ch,
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Cheap sigil test used when scanning transaction metadata. Accepts
    /// anything that starts with the sigil; no length or alphabet checks.
    pub fn looks_like(raw: &str) -> bool {
        raw.starts_with(ADDRESS_SIGIL)
    }

    /// Wrap a value that already passed [`LedgerAddress::looks_like`].
    ///
    /// Metadata addresses come straight from validated ledger state, so the
    /// stricter `parse` checks are not re-applied to them.
    pub fn from_ledger(raw: &str) -> Option<Self> {
        Self::looks_like(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LedgerAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LedgerAddress> for String {
    fn from(value: LedgerAddress) -> Self {
        value.0
    }
}

impl PartialEq<str> for LedgerAddress {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LedgerAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
