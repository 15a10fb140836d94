//! Fixed-interval, non-overlapping report poller.
//!
//! Each poll takes the gateway mutex with `try_lock` and holds it until its
//! result is published. If the previous poll (or a balance lookup) still
//! holds it, the poll is skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stl_reconcile::{fetch_and_reconcile_outcome, ReconcileOutcome};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;
use uuid::Uuid;

use crate::state::{rfc3339, AppState, BusMsg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Fresh { poll_id: Uuid, payments: usize },
    Failed { poll_id: Uuid, error: String },
    /// Another gateway call was in flight.
    Skipped,
    /// Shutdown was requested while the fetch was running.
    Discarded { poll_id: Uuid },
}

/// Run one poll against the shared gateway and publish the result.
pub async fn poll_once(st: &AppState) -> PollResult {
    let Ok(gateway) = st.gateway.try_lock() else {
        st.status.write().await.polls_skipped += 1;
        info!("poll skipped: gateway busy");
        return PollResult::Skipped;
    };

    let poll_id = Uuid::new_v4();
    let started = Utc::now();
    {
        let mut s = st.status.write().await;
        s.poll_state = "polling".to_string();
        s.last_poll_id = Some(poll_id);
        s.last_attempt_at = Some(rfc3339(started));
    }

    let outcome = fetch_and_reconcile_outcome(
        &**gateway,
        &st.directory,
        &[] as &[&str],
        st.history_limit,
    )
    .await;

    if st.shutdown_requested() {
        st.status.write().await.poll_state = "stopped".to_string();
        info!(%poll_id, "poll result discarded: shutdown requested");
        return PollResult::Discarded { poll_id };
    }

    let fetched_at = Utc::now();
    let result = match outcome {
        ReconcileOutcome::Fresh { report, history } => {
            let payments = report.payments.len();
            let partners = report.stats.len();
            {
                let mut c = st.cache.write().await;
                c.report = report;
                c.history = history;
                c.fetched_at = Some(fetched_at);
            }
            {
                let mut s = st.status.write().await;
                s.polls_ok += 1;
                s.last_success_at = Some(rfc3339(fetched_at));
                s.last_error = None;
            }
            let _ = st.bus.send(BusMsg::ReportUpdated {
                poll_id,
                payments,
                partners,
                fetched_at: rfc3339(fetched_at),
            });
            PollResult::Fresh { poll_id, payments }
        }
        ReconcileOutcome::FetchFailed { error } => {
            {
                let mut c = st.cache.write().await;
                c.report = Default::default();
                c.history.clear();
                c.fetched_at = None;
            }
            {
                let mut s = st.status.write().await;
                s.polls_failed += 1;
                s.last_error = Some(error.clone());
            }
            st.log("WARN", format!("poll {poll_id} failed: {error}"));
            PollResult::Failed { poll_id, error }
        }
    };

    let snap = {
        let mut s = st.status.write().await;
        s.poll_state = "idle".to_string();
        s.clone()
    };
    let _ = st.bus.send(BusMsg::Status(snap));

    // Held until the cache and status are written so results land in poll order.
    drop(gateway);
    result
}

/// Spawn the poll loop. The first poll runs immediately; the loop exits once
/// shutdown is requested.
pub fn spawn_poller(st: Arc<AppState>) -> JoinHandle<()> {
    let interval = st.poll_interval.max(Duration::from_secs(1));
    let mut shutdown = st.subscribe_shutdown();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs(), "poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if st.shutdown_requested() {
                        break;
                    }
                    let st = Arc::clone(&st);
                    // Detached; a tick landing during a slow fetch is
                    // skipped by try_lock.
                    tokio::spawn(async move {
                        let _ = poll_once(&st).await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        st.status.write().await.poll_state = "stopped".to_string();
        info!("poller stopped");
    })
}
