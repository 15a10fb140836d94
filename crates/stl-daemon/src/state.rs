//! Shared runtime state for stl-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The gateway sits behind
//! a `tokio::sync::Mutex` so that polls and balance lookups never overlap on
//! one connection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use stl_directory::{Directory, LoadedSettlementConfig};
use stl_ledger::LedgerGateway;
use stl_schemas::{RawTransaction, SettlementReport};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Status(StatusSnapshot),
    ReportUpdated {
        poll_id: Uuid,
        payments: usize,
        partners: usize,
        fetched_at: String,
    },
    LogLine { level: String, msg: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time poll state, returned by GET /v1/status and carried inside
/// SSE `status` events.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    pub profile: String,
    pub config_hash: String,
    pub gateway: String,
    /// "idle" | "polling" | "stopped"
    pub poll_state: String,
    pub poll_interval_secs: u64,
    pub last_poll_id: Option<Uuid>,
    pub last_attempt_at: Option<String>,
    /// Zero payments with a recent success means "no activity"; zero payments
    /// with a stale success means the fetch is failing.
    pub last_success_at: Option<String>,
    pub last_error: Option<String>,
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub polls_skipped: u64,
}

// ---------------------------------------------------------------------------
// PollCache
// ---------------------------------------------------------------------------

/// Result of the most recent completed poll.
#[derive(Clone, Debug, Default)]
pub struct PollCache {
    /// Report over all partners. Empty after a failed poll.
    pub report: SettlementReport,
    /// History the report was built from. Empty after a failed poll.
    pub history: Vec<RawTransaction>,
    pub fetched_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Immutable for the process lifetime.
    pub directory: Arc<Directory>,
    /// One logical session at a time.
    pub gateway: Mutex<Box<dyn LedgerGateway>>,
    pub history_limit: u32,
    pub poll_interval: Duration,
    pub status: Arc<RwLock<StatusSnapshot>>,
    pub cache: Arc<RwLock<PollCache>>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(cfg: LoadedSettlementConfig, gateway: Box<dyn LedgerGateway>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        let (shutdown, _) = watch::channel(false);
        let poll_interval = Duration::from_secs(cfg.settings.poll.interval_secs);

        let initial_status = StatusSnapshot {
            daemon_uptime_secs: uptime_secs(),
            profile: cfg.profile.as_str().to_string(),
            config_hash: cfg.loaded.config_hash.clone(),
            gateway: gateway.name().to_string(),
            poll_state: "idle".to_string(),
            poll_interval_secs: poll_interval.as_secs(),
            ..StatusSnapshot::default()
        };

        Self {
            bus,
            build: BuildInfo {
                service: "stl-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            directory: Arc::new(cfg.directory),
            gateway: Mutex::new(gateway),
            history_limit: cfg.settings.ledger.history_limit,
            poll_interval,
            status: Arc::new(RwLock::new(initial_status)),
            cache: Arc::new(RwLock::new(PollCache::default())),
            shutdown,
        }
    }

    /// Stop issuing new polls. An in-flight poll finishes and its result is
    /// discarded.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let mut snap = self.status.read().await.clone();
        snap.daemon_uptime_secs = uptime_secs();
        snap
    }

    pub fn log(&self, level: &str, msg: impl Into<String>) {
        let _ = self.bus.send(BusMsg::LogLine {
            level: level.to_string(),
            msg: msg.into(),
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
