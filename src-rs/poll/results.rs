//! Live partial results while a computation is still running.
//!
//! The streamer follows an external `is_active` flag (normally the group
//! session's). While active it queries immediately and then every interval,
//! reading the caller's current parameters on every tick. A failed tick is
//! logged and skipped; deactivation discards whatever is in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::session::{FirstTick, PollSession, SessionGuard, Ticker};
use crate::client::{ComputationParams, ResultsSnapshot, TaskApi};
use crate::error::PollError;

pub struct ResultsStreamer {
    api: Arc<dyn TaskApi>,
    interval: Duration,
}

impl ResultsStreamer {
    pub fn new(api: Arc<dyn TaskApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Start following `is_active`. Each applied tick sends the full
    /// replacement snapshot, `None` when the parameters cannot be queried.
    pub fn start(
        &self,
        params: watch::Receiver<ComputationParams>,
        is_active: watch::Receiver<bool>,
        parent: &CancellationToken,
        snapshots: mpsc::UnboundedSender<Option<ResultsSnapshot>>,
    ) -> PollSession {
        let guard = SessionGuard::new(parent, false);
        let run = stream_results(
            Arc::clone(&self.api),
            self.interval,
            guard.clone(),
            params,
            is_active,
            snapshots,
        );
        PollSession::spawn((), self.interval, guard, run)
    }
}

async fn stream_results(
    api: Arc<dyn TaskApi>,
    interval: Duration,
    guard: SessionGuard,
    params: watch::Receiver<ComputationParams>,
    mut is_active: watch::Receiver<bool>,
    snapshots: mpsc::UnboundedSender<Option<ResultsSnapshot>>,
) {
    loop {
        let activated = tokio::select! {
            biased;
            _ = guard.cancelled() => false,
            activated = flag_becomes(&mut is_active, true) => activated,
        };
        if !activated {
            break;
        }

        guard.set_active(true);
        tracing::debug!(session = guard.id(), "Results streaming activated");
        let keep_following = stream_while_active(
            api.as_ref(),
            interval,
            &guard,
            &params,
            &mut is_active,
            &snapshots,
        )
        .await;
        guard.set_active(false);
        tracing::debug!(session = guard.id(), "Results streaming deactivated");

        if !keep_following {
            break;
        }
    }
}

/// Returns `false` when the streamer should stop for good (cancelled, or
/// the activity source went away).
async fn stream_while_active(
    api: &dyn TaskApi,
    interval: Duration,
    guard: &SessionGuard,
    params: &watch::Receiver<ComputationParams>,
    is_active: &mut watch::Receiver<bool>,
    snapshots: &mpsc::UnboundedSender<Option<ResultsSnapshot>>,
) -> bool {
    let mut ticker = Ticker::new(interval, FirstTick::Immediate);

    loop {
        tokio::select! {
            biased;
            deactivated = flag_becomes(is_active, false) => return deactivated,
            live = ticker.tick(guard) => {
                if !live {
                    return false;
                }
            }
        }

        let current = params.borrow().clone();
        if !current.is_queryable() {
            guard.apply(|| {
                let _ = snapshots.send(None);
            });
            continue;
        }

        let outcome = tokio::select! {
            biased;
            _ = guard.cancelled() => return false,
            deactivated = flag_becomes(is_active, false) => return deactivated,
            outcome = api.results(&current) => outcome,
        };

        match outcome {
            Ok(snapshot) => {
                guard.apply(|| {
                    if *is_active.borrow() {
                        let _ = snapshots.send(Some(snapshot));
                    }
                });
            }
            Err(e) => {
                let error = PollError::ResultsTransport(e);
                tracing::warn!(client_id = current.client_id, error = %error, "Skipping failed results tick");
            }
        }
    }
}

/// Resolves once the flag holds `value`; `false` if its sender is gone first.
async fn flag_becomes(flag: &mut watch::Receiver<bool>, value: bool) -> bool {
    flag.wait_for(|current| *current == value).await.is_ok()
}
