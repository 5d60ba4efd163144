//! Group progress polling for fan-out computations.
//!
//! The first query goes out one interval after start: no sub-task can finish
//! sooner. Every tick reports the latest `completed/total`, even unchanged,
//! and the first `COMPLETE` ends the session with a single completion event.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::progress::ProgressTracker;
use super::session::{FirstTick, PollSession, SessionGuard, Ticker};
use crate::client::{GroupHandle, GroupProgress, TaskApi};
use crate::error::PollError;

#[derive(Debug)]
pub enum GroupEvent {
    Progress(GroupProgress),
    Completed(GroupProgress),
    /// Progress could no longer be read; the computation is treated as lost.
    Abandoned(PollError),
}

pub struct GroupProgressPoller {
    api: Arc<dyn TaskApi>,
    interval: Duration,
}

impl GroupProgressPoller {
    pub fn new(api: Arc<dyn TaskApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    pub fn start(
        &self,
        group: GroupHandle,
        parent: &CancellationToken,
        events: mpsc::UnboundedSender<GroupEvent>,
    ) -> PollSession<GroupHandle> {
        let guard = SessionGuard::new(parent, true);
        let run = poll_group(
            Arc::clone(&self.api),
            group.clone(),
            self.interval,
            guard.clone(),
            events,
        );
        PollSession::spawn(group, self.interval, guard, run)
    }
}

async fn poll_group(
    api: Arc<dyn TaskApi>,
    group: GroupHandle,
    interval: Duration,
    guard: SessionGuard,
    events: mpsc::UnboundedSender<GroupEvent>,
) {
    tracing::debug!(session = guard.id(), group_id = %group, "Group polling started");

    let mut ticker = Ticker::new(interval, FirstTick::AfterInterval);
    let mut tracker = ProgressTracker::default();

    while ticker.tick(&guard).await {
        let Some(response) = guard.guarded(api.group_progress(&group)).await else {
            break;
        };

        let reported = match response {
            Ok(reported) => reported,
            Err(e) => {
                tracing::warn!(
                    group_id = %group,
                    last_known = ?tracker.latest(),
                    error = %e,
                    "Group progress request failed",
                );
                guard.apply(|| {
                    let _ = events.send(GroupEvent::Abandoned(PollError::GroupTransport(e)));
                });
                break;
            }
        };

        let finished = guard.apply(|| {
            let progress = tracker.observe(reported);
            let _ = events.send(GroupEvent::Progress(progress));
            if tracker.take_completion() {
                let _ = events.send(GroupEvent::Completed(progress));
                return true;
            }
            false
        });

        match finished {
            Some(false) => continue,
            Some(true) => {
                tracing::info!(group_id = %group, "Task group complete");
                break;
            }
            None => break,
        }
    }

    guard.set_active(false);
    tracing::debug!(session = guard.id(), group_id = %group, "Group polling stopped");
}
