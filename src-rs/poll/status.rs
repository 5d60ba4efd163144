//! Single-task status polling.
//!
//! Queries immediately, then every interval, until the task reports
//! `SUCCESS` or `FAILURE`. A success triggers exactly one fetch of the final
//! payload. Transport errors end the session like a reported failure.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::session::{FirstTick, PollSession, SessionGuard, Ticker};
use crate::client::{TaskApi, TaskHandle, TaskStatus};
use crate::error::PollError;

#[derive(Debug, thiserror::Error)]
pub enum TaskFailure {
    #[error("the task reported FAILURE")]
    Reported,

    #[error(transparent)]
    Transport(PollError),
}

#[derive(Debug)]
pub enum TaskEvent {
    /// Status observed on a tick.
    Status(TaskStatus),
    /// Final payload, fetched once after `SUCCESS`.
    Succeeded(Value),
    Failed(TaskFailure),
}

pub struct StatusPoller {
    api: Arc<dyn TaskApi>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn TaskApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Start polling `task`. The returned session must be kept alive by the
    /// caller; dropping it stops the loop.
    pub fn start(
        &self,
        task: TaskHandle,
        parent: &CancellationToken,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) -> PollSession<TaskHandle> {
        let guard = SessionGuard::new(parent, true);
        let run = poll_status(
            Arc::clone(&self.api),
            task.clone(),
            self.interval,
            guard.clone(),
            events,
        );
        PollSession::spawn(task, self.interval, guard, run)
    }
}

async fn poll_status(
    api: Arc<dyn TaskApi>,
    task: TaskHandle,
    interval: Duration,
    guard: SessionGuard,
    events: mpsc::UnboundedSender<TaskEvent>,
) {
    tracing::debug!(session = guard.id(), task_id = %task, "Status polling started");

    let mut ticker = Ticker::new(interval, FirstTick::Immediate);
    let mut status = TaskStatus::Pending;

    while ticker.tick(&guard).await {
        let Some(response) = guard.guarded(api.task_status(&task)).await else {
            break;
        };

        let observed = match response {
            Ok(response) => response.status,
            Err(e) => {
                tracing::warn!(task_id = %task, error = %e, "Task status request failed");
                guard.apply(|| {
                    let failure = TaskFailure::Transport(PollError::StatusTransport(e));
                    let _ = events.send(TaskEvent::Failed(failure));
                });
                break;
            }
        };

        let Some(current) = guard.apply(|| {
            status = status.advance(observed);
            let _ = events.send(TaskEvent::Status(status));
            status
        }) else {
            break;
        };

        match current {
            TaskStatus::Pending => continue,
            TaskStatus::Failure => {
                tracing::info!(task_id = %task, "Task reported failure");
                guard.apply(|| {
                    let _ = events.send(TaskEvent::Failed(TaskFailure::Reported));
                });
                break;
            }
            TaskStatus::Success => {
                fetch_final_result(api.as_ref(), &task, &guard, &events).await;
                break;
            }
        }
    }

    guard.set_active(false);
    tracing::debug!(session = guard.id(), task_id = %task, "Status polling stopped");
}

async fn fetch_final_result(
    api: &dyn TaskApi,
    task: &TaskHandle,
    guard: &SessionGuard,
    events: &mpsc::UnboundedSender<TaskEvent>,
) {
    let Some(outcome) = guard.guarded(api.task_result(task)).await else {
        return;
    };
    guard.apply(|| match outcome {
        Ok(payload) => {
            tracing::info!(task_id = %task, "Task succeeded");
            let _ = events.send(TaskEvent::Succeeded(payload));
        }
        Err(e) => {
            tracing::warn!(task_id = %task, error = %e, "Fetching task result failed");
            let failure = TaskFailure::Transport(PollError::StatusTransport(e));
            let _ = events.send(TaskEvent::Failed(failure));
        }
    });
}
