//! Typed settlement settings and the two configuration profiles.
//!
//! - `demo`: the built-in [`DEMO_PROFILE_YAML`] is the base layer, so an
//!   operator overlay only needs to state what differs.
//! - `operator`: no built-in base. The supplied layers must define the hub
//!   and every partner; anything missing fails at load time.
//!
//! Both profiles go through the same eager validation.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use stl_schemas::LedgerAddress;

use crate::directory::{Directory, Hub, Participant};
use crate::{load_layered_yaml_from_strings, LoadedConfig};

/// Public test-network accounts used by the demo profile.
pub const DEMO_PROFILE_YAML: &str = r#"
ledger:
  rpc_url: "https://s.devnet.rippletest.net:51234"
  history_limit: 200
  request_timeout_secs: 10
hub:
  key: "toss_main"
  label: "TOSS"
  address: "rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe"
partners:
  paypay:
    display_name: "PG"
    category: "digital_payment"
    address: "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"
  convenience_a:
    display_name: "Convenience Store A (7-Eleven)"
    category: "convenience_store"
    address: "rsTPNoEaEaPPy1AfusedP9VstsZK8K1zqS"
  convenience_b:
    display_name: "Convenience Store B (CU)"
    category: "convenience_store"
    address: "rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH"
  bank_a:
    display_name: "Bank A (Shinhan)"
    category: "bank"
    address: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"
  bank_b:
    display_name: "Bank B (Hana)"
    category: "bank"
    address: "rPEPPER7kfTD9w2To4CQk6UCfuHM9c6GDY"
  ecommerce_a:
    display_name: "Online Shopping A (Coupang)"
    category: "ecommerce"
    address: "rLNaPoKeeBjZe2qs6x52yVPZpZ8td4dc6w"
poll:
  interval_secs: 30
"#;

const MAX_HISTORY_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Demo,
    Operator,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Demo => "demo",
            Profile::Operator => "operator",
        }
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Profile::Demo),
            "operator" => Ok(Profile::Operator),
            other => Err(anyhow!(
                "invalid profile '{}'. expected one of: demo | operator",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerSettings {
    /// JSON-RPC endpoint of a ledger node.
    pub rpc_url: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// NAME of the env var holding an optional RPC bearer token.
    #[serde(default)]
    pub auth_token_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct HubEntry {
    key: String,
    #[serde(default)]
    label: Option<String>,
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartnerEntry {
    display_name: String,
    address: String,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    ledger: LedgerSettings,
    hub: HubEntry,
    #[serde(default)]
    partners: BTreeMap<String, PartnerEntry>,
    #[serde(default)]
    poll: PollSettings,
}

fn default_history_limit() -> u32 {
    200
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    30
}

/// Validated, non-directory settings.
#[derive(Debug, Clone)]
pub struct SettlementSettings {
    pub ledger: LedgerSettings,
    pub poll: PollSettings,
}

#[derive(Debug, Clone)]
pub struct LoadedSettlementConfig {
    pub profile: Profile,
    pub loaded: LoadedConfig,
    pub settings: SettlementSettings,
    pub directory: Directory,
}

/// Load and validate settlement config from YAML files (merge order).
pub fn load_settlement_config(profile: Profile, paths: &[&str]) -> Result<LoadedSettlementConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw = std::fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_settlement_config_from_strings(profile, &doc_refs)
}

pub fn load_settlement_config_from_strings(
    profile: Profile,
    yaml_docs: &[&str],
) -> Result<LoadedSettlementConfig> {
    let mut layers: Vec<&str> = Vec::with_capacity(yaml_docs.len() + 1);
    if profile == Profile::Demo {
        layers.push(DEMO_PROFILE_YAML);
    } else if yaml_docs.is_empty() {
        bail!("CONFIG_INVALID profile=operator: no configuration layers supplied");
    }
    layers.extend_from_slice(yaml_docs);

    let loaded = load_layered_yaml_from_strings(&layers)?;

    let raw: RawSettings = serde_json::from_value(loaded.config_json.clone())
        .with_context(|| format!("CONFIG_INVALID profile={}", profile.as_str()))?;

    let (settings, directory) = validate(raw)
        .with_context(|| format!("CONFIG_INVALID profile={}", profile.as_str()))?;

    Ok(LoadedSettlementConfig {
        profile,
        loaded,
        settings,
        directory,
    })
}

fn validate(raw: RawSettings) -> Result<(SettlementSettings, Directory)> {
    if raw.ledger.rpc_url.trim().is_empty() {
        bail!("ledger.rpc_url is empty");
    }
    if !(1..=MAX_HISTORY_LIMIT).contains(&raw.ledger.history_limit) {
        bail!(
            "ledger.history_limit={} outside 1..={}",
            raw.ledger.history_limit,
            MAX_HISTORY_LIMIT
        );
    }
    if raw.ledger.request_timeout_secs == 0 {
        bail!("ledger.request_timeout_secs must be >= 1");
    }
    if raw.poll.interval_secs == 0 {
        bail!("poll.interval_secs must be >= 1");
    }

    let hub_address = LedgerAddress::parse(&raw.hub.address).context("hub.address")?;
    let hub = Hub {
        label: raw.hub.label.unwrap_or_else(|| raw.hub.key.clone()),
        key: raw.hub.key,
        address: hub_address,
    };

    let mut partners = Vec::with_capacity(raw.partners.len());
    for (key, entry) in raw.partners {
        let address = LedgerAddress::parse(&entry.address)
            .with_context(|| format!("partners.{key}.address"))?;
        partners.push(Participant {
            key,
            display_name: entry.display_name,
            address,
            category: entry.category,
        });
    }

    let directory = Directory::new(hub, partners)?;

    Ok((
        SettlementSettings {
            ledger: raw.ledger,
            poll: raw.poll,
        },
        directory,
    ))
}
