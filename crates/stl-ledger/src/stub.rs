//! In-memory gateway for tests.
//!
//! Serves canned histories and account records keyed by address. Failures
//! and latency can be injected to exercise the fetch-failure and
//! overlapping-poll paths without a node.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use stl_schemas::amount::drops_to_native;
use stl_schemas::{AccountInfo, LedgerAddress, RawTransaction};

use crate::{GatewayError, LedgerGateway, TxQuery};

#[derive(Default)]
struct StubState {
    histories: HashMap<String, Vec<RawTransaction>>,
    accounts: HashMap<String, AccountInfo>,
    connect_error: Option<GatewayError>,
    request_error: Option<GatewayError>,
    delay: Option<Duration>,
    last_limit: Option<u32>,
}

#[derive(Default)]
pub struct StubGateway {
    state: Mutex<StubState>,
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StubState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn set_history(&self, address: &LedgerAddress, history: Vec<RawTransaction>) {
        self.with_state(|s| {
            s.histories.insert(address.as_str().to_string(), history);
        });
    }

    /// Same as [`set_history`](Self::set_history) but from raw `account_tx`
    /// entries. Non-object entries are dropped.
    pub fn set_history_json(&self, address: &LedgerAddress, entries: &[Value]) {
        let history = entries.iter().filter_map(RawTransaction::from_entry).collect();
        self.set_history(address, history);
    }

    pub fn set_account(
        &self,
        address: &LedgerAddress,
        balance_drops: &str,
        owner_count: u32,
        sequence: u32,
    ) {
        let info = AccountInfo {
            address: address.clone(),
            balance: drops_to_native(balance_drops).unwrap_or_default(),
            balance_drops: balance_drops.to_string(),
            owner_count,
            sequence,
        };
        self.with_state(|s| {
            s.accounts.insert(address.as_str().to_string(), info);
        });
    }

    /// Make `connect()` fail with `err` (or succeed again with `None`).
    pub fn fail_connect(&self, err: Option<GatewayError>) {
        self.with_state(|s| s.connect_error = err);
    }

    /// Make every request fail with `err` (or succeed again with `None`).
    pub fn fail_requests(&self, err: Option<GatewayError>) {
        self.with_state(|s| s.request_error = err);
    }

    /// Sleep this long inside each history request.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.delay = delay);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> Option<u32> {
        self.with_state(|s| s.last_limit)
    }

    fn precheck(&self) -> Result<(), GatewayError> {
        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        match self.with_state(|s| s.request_error.clone()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl LedgerGateway for StubGateway {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.with_state(|s| s.connect_error.clone()) {
            return Err(err);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn account_info(&self, address: &LedgerAddress) -> Result<AccountInfo, GatewayError> {
        self.precheck()?;
        self.with_state(|s| s.accounts.get(address.as_str()).cloned())
            .ok_or_else(|| GatewayError::Api {
                code: "actNotFound".to_string(),
                message: "Account not found.".to_string(),
            })
    }

    async fn account_transactions(
        &self,
        address: &LedgerAddress,
        limit: u32,
        _query: TxQuery,
    ) -> Result<Vec<RawTransaction>, GatewayError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.precheck()?;

        let delay = self.with_state(|s| {
            s.last_limit = Some(limit);
            s.delay
        });
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let mut history = self
            .with_state(|s| s.histories.get(address.as_str()).cloned())
            .unwrap_or_default();
        history.truncate(limit as usize);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerSession;
    use serde_json::json;

    fn hub() -> LedgerAddress {
        LedgerAddress::parse("rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe").unwrap()
    }

    #[tokio::test]
    async fn history_is_truncated_to_limit() {
        let gw = StubGateway::new();
        gw.set_history_json(
            &hub(),
            &[json!({"hash": "A"}), json!({"hash": "B"}), json!(42), json!({"hash": "C"})],
        );

        let session = LedgerSession::open(&gw).await.unwrap();
        let got = session
            .account_transactions(&hub(), 2, TxQuery::default())
            .await
            .unwrap();
        session.close().await;

        let hashes: Vec<_> = got.iter().filter_map(|t| t.hash.as_deref()).collect();
        assert_eq!(hashes, vec!["A", "B"]);
        assert_eq!(gw.last_limit(), Some(2));
    }

    #[tokio::test]
    async fn unknown_account_is_act_not_found() {
        let gw = StubGateway::new();
        let session = LedgerSession::open(&gw).await.unwrap();
        let err = session.account_info(&hub()).await.unwrap_err();
        session.close().await;
        assert!(err.is_account_not_found());
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let gw = StubGateway::new();
        gw.fail_connect(Some(GatewayError::Timeout));
        assert_eq!(
            LedgerSession::open(&gw).await.err(),
            Some(GatewayError::Timeout)
        );

        gw.fail_connect(None);
        gw.fail_requests(Some(GatewayError::Transport("boom".into())));
        let session = LedgerSession::open(&gw).await.unwrap();
        let err = session
            .account_transactions(&hub(), 5, TxQuery::default())
            .await
            .unwrap_err();
        session.close().await;
        assert_eq!(err, GatewayError::Transport("boom".into()));
    }
}
