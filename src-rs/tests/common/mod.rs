#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use telemetry_tasks::client::{StartTaskResponse, TaskStatusResponse};
use telemetry_tasks::{
    ComputationParams, GroupHandle, GroupProgress, ResultsSnapshot, TaskApi, TaskHandle, TaskStatus, TransportError,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Start(ComputationParams),
    Status(TaskHandle),
    Result(TaskHandle),
    Progress(GroupHandle),
    Results(ComputationParams),
}

type Queue<T> = Mutex<VecDeque<Result<T, TransportError>>>;

/// `TaskApi` that answers from per-endpoint queues and records every call
/// with its (paused-clock) time since construction.
///
/// Empty queues fall back to: status `PENDING`, result `null`, the last
/// progress seen (or `ACTIVE 0/0`), an empty results snapshot, and a
/// malformed-response error for starts.
pub struct ScriptedApi {
    started: Instant,
    latency: Duration,
    starts: Queue<StartTaskResponse>,
    statuses: Queue<TaskStatus>,
    task_results: Queue<Value>,
    progress: Queue<GroupProgress>,
    last_progress: Mutex<GroupProgress>,
    results: Queue<ResultsSnapshot>,
    calls: Mutex<Vec<(Duration, Call)>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            latency: Duration::ZERO,
            starts: Mutex::default(),
            statuses: Mutex::default(),
            task_results: Mutex::default(),
            progress: Mutex::default(),
            last_progress: Mutex::new(GroupProgress::active(0, 0)),
            results: Mutex::default(),
            calls: Mutex::default(),
        }
    }

    /// Every response arrives this long after its request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn start_group(self, id: &str) -> Self {
        self.push_start(Ok(StartTaskResponse {
            task_id: None,
            group_id: Some(id.to_string()),
        }));
        self
    }

    pub fn start_task(self, id: &str) -> Self {
        self.push_start(Ok(StartTaskResponse {
            task_id: Some(id.to_string()),
            group_id: None,
        }));
        self
    }

    pub fn start_with(self, response: Result<StartTaskResponse, TransportError>) -> Self {
        self.push_start(response);
        self
    }

    pub fn status(self, status: TaskStatus) -> Self {
        push(&self.statuses, Ok(status));
        self
    }

    pub fn status_error(self, status: u16) -> Self {
        push(&self.statuses, Err(fail(status)));
        self
    }

    pub fn task_result(self, payload: Value) -> Self {
        push(&self.task_results, Ok(payload));
        self
    }

    pub fn progress(self, progress: GroupProgress) -> Self {
        push(&self.progress, Ok(progress));
        self
    }

    pub fn progress_error(self, status: u16) -> Self {
        push(&self.progress, Err(fail(status)));
        self
    }

    pub fn results(self, rows: Vec<Value>) -> Self {
        push(&self.results, Ok(ResultsSnapshot::new(rows)));
        self
    }

    pub fn results_error(self, status: u16) -> Self {
        push(&self.results, Err(fail(status)));
        self
    }

    pub fn calls(&self) -> Vec<(Duration, Call)> {
        self.calls.lock().unwrap().clone()
    }

    /// Seconds (since construction) at which matching calls were made.
    pub fn times_of(&self, matches: impl Fn(&Call) -> bool) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter(|(_, call)| matches(call))
            .map(|(at, _)| at.as_secs())
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|(_, call)| matches(call)).count()
    }

    fn push_start(&self, response: Result<StartTaskResponse, TransportError>) {
        push(&self.starts, response);
    }

    async fn respond<T>(&self, call: Call, queue: &Queue<T>, fallback: impl FnOnce() -> Result<T, TransportError>) -> Result<T, TransportError> {
        self.calls.lock().unwrap().push((self.started.elapsed(), call));
        let next = queue.lock().unwrap().pop_front();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        next.unwrap_or_else(fallback)
    }
}

fn push<T>(queue: &Queue<T>, item: Result<T, TransportError>) {
    queue.lock().unwrap().push_back(item);
}

pub fn fail(status: u16) -> TransportError {
    TransportError::Api {
        status,
        body: "scripted failure".to_string(),
    }
}

#[async_trait]
impl TaskApi for ScriptedApi {
    async fn start_task(&self, params: &ComputationParams) -> Result<StartTaskResponse, TransportError> {
        self.respond(Call::Start(params.clone()), &self.starts, || {
            Err(TransportError::Malformed("no scripted start response".to_string()))
        })
        .await
    }

    async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatusResponse, TransportError> {
        let status = self
            .respond(Call::Status(task.clone()), &self.statuses, || Ok(TaskStatus::Pending))
            .await?;
        Ok(TaskStatusResponse {
            task_id: task.to_string(),
            status,
            result: None,
        })
    }

    async fn task_result(&self, task: &TaskHandle) -> Result<Value, TransportError> {
        self.respond(Call::Result(task.clone()), &self.task_results, || Ok(Value::Null))
            .await
    }

    async fn group_progress(&self, group: &GroupHandle) -> Result<GroupProgress, TransportError> {
        let last = *self.last_progress.lock().unwrap();
        let progress = self
            .respond(Call::Progress(group.clone()), &self.progress, || Ok(last))
            .await?;
        *self.last_progress.lock().unwrap() = progress;
        Ok(progress)
    }

    async fn results(&self, params: &ComputationParams) -> Result<ResultsSnapshot, TransportError> {
        self.respond(Call::Results(params.clone()), &self.results, || Ok(ResultsSnapshot::default()))
            .await
    }
}

pub fn params() -> ComputationParams {
    ComputationParams::new(93, 2024, 5)
}

/// Let spawned loops run until they block again without moving the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
