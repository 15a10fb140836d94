//! Axum router and all HTTP handlers for stl-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` compose the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use stl_ledger::LedgerSession;
use stl_reconcile::reconcile;
use stl_schemas::LedgerAddress;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        BalanceEntry, BalancesResponse, ErrorResponse, HealthResponse, PartnerEntry,
        PartnersResponse, ReportQuery, ReportResponse,
    },
    poller::{poll_once, PollResult},
    state::{rfc3339, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/partners", get(partners))
        .route("/v1/report", get(report))
        .route("/v1/balances", get(balances))
        .route("/v1/poll", post(poll_now))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.status_snapshot().await;
    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// GET /v1/partners
// ---------------------------------------------------------------------------

pub(crate) async fn partners(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let hub = st.directory.hub();
    let partners = st
        .directory
        .partners()
        .iter()
        .map(|p| PartnerEntry {
            key: p.key.clone(),
            display_name: p.display_name.clone(),
            address: p.address.to_string(),
            category: p.category.clone(),
        })
        .collect();

    (
        StatusCode::OK,
        Json(PartnersResponse {
            hub_key: hub.key.clone(),
            hub_label: hub.label.clone(),
            hub_address: hub.address.to_string(),
            partners,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/report?partners=k1,k2
// ---------------------------------------------------------------------------

/// Latest report. With a partner selection the cached history is
/// re-reconciled for that selection; nothing is fetched.
pub(crate) async fn report(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ReportQuery>,
) -> Response {
    let keys = q.keys();
    let selected = match st.directory.select(&keys) {
        Ok(s) => s,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let last_error = st.status.read().await.last_error.clone();
    let cache = st.cache.read().await;

    let report = if keys.is_empty() {
        cache.report.clone()
    } else {
        reconcile(
            st.directory.hub_address(),
            &cache.history,
            &selected,
            &st.directory,
        )
    };

    (
        StatusCode::OK,
        Json(ReportResponse {
            fetched_at: cache.fetched_at.map(rfc3339),
            last_error,
            report,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/balances
// ---------------------------------------------------------------------------

/// Hub and partner balances. Waits for any in-flight poll to release the
/// gateway.
pub(crate) async fn balances(State(st): State<Arc<AppState>>) -> Response {
    let hub = st.directory.hub();
    let mut targets: Vec<(String, String, LedgerAddress)> =
        vec![(hub.key.clone(), hub.label.clone(), hub.address.clone())];
    targets.extend(
        st.directory
            .partners()
            .iter()
            .map(|p| (p.key.clone(), p.display_name.clone(), p.address.clone())),
    );

    let gateway = st.gateway.lock().await;
    let session = match LedgerSession::open(&**gateway).await {
        Ok(s) => s,
        Err(e) => {
            st.log("WARN", format!("balances: gateway unavailable: {e}"));
            return error(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
        }
    };

    let mut accounts = Vec::with_capacity(targets.len());
    for (key, label, address) in targets {
        let entry = match session.account_info(&address).await {
            Ok(info) => BalanceEntry {
                key,
                label,
                address: address.to_string(),
                balance: Some(info.balance),
                owner_count: Some(info.owner_count),
                sequence: Some(info.sequence),
                error: None,
            },
            Err(e) => BalanceEntry {
                key,
                label,
                address: address.to_string(),
                balance: None,
                owner_count: None,
                sequence: None,
                error: Some(e.to_string()),
            },
        };
        accounts.push(entry);
    }
    session.close().await;
    drop(gateway);

    (
        StatusCode::OK,
        Json(BalancesResponse {
            fetched_at: rfc3339(Utc::now()),
            accounts,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/poll
// ---------------------------------------------------------------------------

pub(crate) async fn poll_now(State(st): State<Arc<AppState>>) -> Response {
    if st.shutdown_requested() {
        return error(StatusCode::SERVICE_UNAVAILABLE, "shutting down");
    }

    let result = poll_once(&st).await;
    info!(?result, "poll/now");
    match result {
        PollResult::Skipped => error(
            StatusCode::CONFLICT,
            "POLL_IN_FLIGHT: a gateway call is already running",
        ),
        _ => (StatusCode::OK, Json(st.status_snapshot().await)).into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::ReportUpdated { .. } => "report",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
