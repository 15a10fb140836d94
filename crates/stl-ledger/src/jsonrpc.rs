//! JSON-RPC (HTTP) ledger gateway.
//!
//! Speaks the node's public JSON-RPC API:
//! - `server_info`: connectivity probe on `connect()`
//! - `account_info`: balance, owner count and sequence
//! - `account_tx`: transaction history, following `marker` pagination
//!
//! The bearer token (if any) is passed in by the caller; do not log it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use stl_schemas::amount::drops_to_native;
use stl_schemas::{AccountInfo, LedgerAddress, RawTransaction};

use crate::{GatewayError, LedgerGateway, TxQuery};

/// Largest page the public API serves per `account_tx` call.
const MAX_PAGE: u32 = 400;

pub struct JsonRpcGateway {
    http: reqwest::Client,
    url: String,
    auth_token: Option<String>,
    connected: AtomicBool,
}

impl std::fmt::Debug for JsonRpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcGateway")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<REDACTED>"))
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

impl JsonRpcGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            auth_token: None,
            connected: AtomicBool::new(false),
        })
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn ensure_connected(&self) -> Result<(), GatewayError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::NotConnected)
        }
    }

    /// POST one JSON-RPC call and return its `result` object.
    async fn call(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let body = json!({ "method": method, "params": [params] });

        let mut req = self.http.post(&self.url).json(&body);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(map_reqwest_error)?;
        let status = resp.status();
        let envelope: RpcEnvelope = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("{method} response json decode failed: {e}")))?;

        if let Some(err) = envelope.result.error_code() {
            return Err(err);
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "{method} http status={}",
                status.as_u16()
            )));
        }
        Ok(envelope.result)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
}

trait RpcResultExt {
    fn error_code(&self) -> Option<GatewayError>;
}

impl RpcResultExt for Value {
    fn error_code(&self) -> Option<GatewayError> {
        // The node reports errors as `"status": "error"` plus an `error` token.
        if self.get("status").and_then(Value::as_str) != Some("error") {
            return None;
        }
        let code = self
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let message = self
            .get("error_message")
            .and_then(Value::as_str)
            .unwrap_or(&code)
            .to_string();
        Some(GatewayError::Api { code, message })
    }
}

#[async_trait::async_trait]
impl LedgerGateway for JsonRpcGateway {
    fn name(&self) -> &'static str {
        "jsonrpc"
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        let info = self.call("server_info", json!({})).await?;
        let state = info
            .pointer("/info/server_state")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::debug!(url = %self.url, server_state = state, "ledger node reachable");
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn account_info(&self, address: &LedgerAddress) -> Result<AccountInfo, GatewayError> {
        self.ensure_connected()?;
        let result = self
            .call(
                "account_info",
                json!({ "account": address.as_str(), "ledger_index": "validated" }),
            )
            .await?;

        let data = result
            .get("account_data")
            .ok_or_else(|| GatewayError::Decode("account_info: missing account_data".into()))?;
        let balance_drops = data
            .get("Balance")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Decode("account_info: missing Balance".into()))?
            .to_string();
        let balance = drops_to_native(&balance_drops).ok_or_else(|| {
            GatewayError::Decode(format!("account_info: bad Balance '{balance_drops}'"))
        })?;
        let as_u32 = |key: &str| {
            data.get(key)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        };

        Ok(AccountInfo {
            address: address.clone(),
            balance,
            balance_drops,
            owner_count: as_u32("OwnerCount"),
            sequence: as_u32("Sequence"),
        })
    }

    async fn account_transactions(
        &self,
        address: &LedgerAddress,
        limit: u32,
        query: TxQuery,
    ) -> Result<Vec<RawTransaction>, GatewayError> {
        self.ensure_connected()?;
        tracing::debug!(account = %address, limit, "account_tx start");

        let mut out: Vec<RawTransaction> = Vec::new();
        let mut marker: Option<Value> = None;

        while (out.len() as u32) < limit {
            let page = (limit - out.len() as u32).min(MAX_PAGE);
            let mut params = json!({
                "account": address.as_str(),
                "limit": page,
                "ledger_index_min": query.ledger_index_min,
                "ledger_index_max": query.ledger_index_max,
                "forward": query.forward,
            });
            if let Some(m) = marker.take() {
                params["marker"] = m;
            }

            let result = self.call("account_tx", params).await?;
            let entries = result
                .get("transactions")
                .and_then(Value::as_array)
                .ok_or_else(|| GatewayError::Decode("account_tx: missing transactions".into()))?;

            for (i, entry) in entries.iter().enumerate() {
                match RawTransaction::from_entry(entry) {
                    Some(raw) => out.push(raw),
                    None => tracing::warn!(
                        account = %address,
                        index = i,
                        "account_tx: skipping entry that is not an object"
                    ),
                }
            }

            marker = result.get("marker").filter(|m| !m.is_null()).cloned();
            if marker.is_none() || entries.is_empty() {
                break;
            }
        }

        out.truncate(limit as usize);
        tracing::debug!(account = %address, count = out.len(), "account_tx done");
        Ok(out)
    }
}
