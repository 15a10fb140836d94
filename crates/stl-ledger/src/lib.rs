//! stl-ledger
//!
//! Ledger Access Gateway boundary.
//!
//! This crate owns the gateway contract and the JSON-RPC implementation. It
//! does **not** interpret transactions; callers hand the raw history to
//! `stl-reconcile`.
//!
//! There is no process-wide client. Callers own a gateway and open a
//! [`LedgerSession`] around the requests they make.

pub mod jsonrpc;
#[cfg(any(test, feature = "testkit"))]
pub mod stub;

pub use jsonrpc::JsonRpcGateway;

use std::fmt;

use rust_decimal::Decimal;
use stl_schemas::{AccountInfo, LedgerAddress, RawTransaction};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Typed failure of a gateway request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network or transport failure.
    Transport(String),
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The node answered with an application-level error (e.g. `actNotFound`).
    Api { code: String, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A request was made outside an open session.
    NotConnected,
}

impl GatewayError {
    /// True for the ledger's "account does not exist" answer.
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, GatewayError::Api { code, .. } if code == "actNotFound")
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(msg) => write!(f, "transport error: {msg}"),
            GatewayError::Timeout => write!(f, "ledger request timed out"),
            GatewayError::Api { code, message } => {
                write!(f, "ledger api error {code}: {message}")
            }
            GatewayError::Decode(msg) => write!(f, "decode error: {msg}"),
            GatewayError::NotConnected => write!(f, "gateway is not connected"),
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// Request options
// ---------------------------------------------------------------------------

/// History window for `account_tx`. The default is the full validated range,
/// newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxQuery {
    /// `-1` = earliest validated ledger.
    pub ledger_index_min: i64,
    /// `-1` = latest validated ledger.
    pub ledger_index_max: i64,
    /// `false` = reverse-chronological.
    pub forward: bool,
}

impl Default for TxQuery {
    fn default() -> Self {
        Self {
            ledger_index_min: -1,
            ledger_index_max: -1,
            forward: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Ledger access contract.
///
/// One gateway models one logical session with a node; callers must not
/// issue overlapping requests against the same gateway.
#[async_trait::async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Human-readable name (e.g. `"jsonrpc"`).
    fn name(&self) -> &'static str;

    async fn connect(&self) -> Result<(), GatewayError>;

    async fn disconnect(&self);

    async fn account_info(&self, address: &LedgerAddress) -> Result<AccountInfo, GatewayError>;

    /// Up to `limit` history entries for `address`, in the order the node
    /// returns them (reverse-chronological under the default query).
    async fn account_transactions(
        &self,
        address: &LedgerAddress,
        limit: u32,
        query: TxQuery,
    ) -> Result<Vec<RawTransaction>, GatewayError>;

    /// Native balance in major units.
    async fn account_balance(&self, address: &LedgerAddress) -> Result<Decimal, GatewayError> {
        Ok(self.account_info(address).await?.balance)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Caller-owned, scoped use of a gateway: `open` connects, `close`
/// disconnects. A session dropped without `close` logs a warning.
pub struct LedgerSession<'g, G: LedgerGateway + ?Sized> {
    gateway: &'g G,
    open: bool,
}

impl<'g, G: LedgerGateway + ?Sized> LedgerSession<'g, G> {
    pub async fn open(gateway: &'g G) -> Result<Self, GatewayError> {
        gateway.connect().await?;
        tracing::debug!(gateway = gateway.name(), "ledger session opened");
        Ok(Self {
            gateway,
            open: true,
        })
    }

    pub fn gateway(&self) -> &G {
        self.gateway
    }

    pub async fn account_info(&self, address: &LedgerAddress) -> Result<AccountInfo, GatewayError> {
        self.gateway.account_info(address).await
    }

    pub async fn account_transactions(
        &self,
        address: &LedgerAddress,
        limit: u32,
        query: TxQuery,
    ) -> Result<Vec<RawTransaction>, GatewayError> {
        self.gateway
            .account_transactions(address, limit, query)
            .await
    }

    pub async fn account_balance(&self, address: &LedgerAddress) -> Result<Decimal, GatewayError> {
        self.gateway.account_balance(address).await
    }

    pub async fn close(mut self) {
        self.open = false;
        self.gateway.disconnect().await;
        tracing::debug!(gateway = self.gateway.name(), "ledger session closed");
    }
}

impl<G: LedgerGateway + ?Sized> Drop for LedgerSession<'_, G> {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!(
                gateway = self.gateway.name(),
                "ledger session dropped without close()"
            );
        }
    }
}
