use std::fmt;

use async_trait::async_trait;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Server-issued id of a single background task.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-issued id of a fan-out of sub-tasks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupHandle(String);

impl GroupHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmittedHandle {
    Task(TaskHandle),
    Group(GroupHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }

    /// Next state after observing `next`. Terminal states absorb everything.
    pub fn advance(self, next: TaskStatus) -> TaskStatus {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    #[default]
    Active,
    Complete,
}

/// Aggregate progress of a group. Absent counters read as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProgress {
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub status: GroupStatus,
}

impl GroupProgress {
    pub fn active(completed: u64, total: u64) -> Self {
        Self {
            completed,
            total,
            status: GroupStatus::Active,
        }
    }

    pub fn complete(completed: u64, total: u64) -> Self {
        Self {
            completed,
            total,
            status: GroupStatus::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == GroupStatus::Complete
    }

    /// Completion in percent, always within `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let done = self.completed.min(self.total);
        (done as f64 * 100.0) / self.total as f64
    }

    pub fn fraction(&self) -> f64 {
        self.percent() / 100.0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StartTaskResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

impl StartTaskResponse {
    /// The handle to poll. A group id wins when both are present.
    pub fn into_handle(self) -> Option<SubmittedHandle> {
        let non_empty = |id: Option<String>| id.filter(|v| !v.trim().is_empty());
        if let Some(group) = non_empty(self.group_id) {
            return Some(SubmittedHandle::Group(GroupHandle::new(group)));
        }
        non_empty(self.task_id).map(|task| SubmittedHandle::Task(TaskHandle::new(task)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationKind {
    /// Fan-out over every device-day of the month, tracked as a group.
    #[default]
    MonthlyBreakdown,
    /// One task returning the month's totals.
    MonthlySummary,
}

/// Caller-editable inputs of a computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationParams {
    pub client_id: i64,
    pub year: i32,
    pub month: u32,
    #[serde(skip)]
    pub kind: ComputationKind,
}

impl Default for ComputationParams {
    fn default() -> Self {
        let today = chrono::Utc::now().date_naive();
        Self {
            client_id: 0,
            year: today.year(),
            month: today.month(),
            kind: ComputationKind::default(),
        }
    }
}

impl ComputationParams {
    pub fn new(client_id: i64, year: i32, month: u32) -> Self {
        Self {
            client_id,
            year,
            month,
            kind: ComputationKind::default(),
        }
    }

    pub fn with_kind(mut self, kind: ComputationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_queryable(&self) -> bool {
        self.client_id > 0 && (1..=12).contains(&self.month)
    }
}

/// Latest full set of result rows. Rows stay opaque.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ResultsSnapshot {
    pub fn new(data: Vec<Value>) -> Self {
        Self { data }
    }

    /// Snapshot view of a final task payload: its `data` array when it has
    /// one, otherwise the payload as a single row.
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(rows)) => Self { data: rows },
                Some(other) => {
                    map.insert("data".to_string(), other);
                    Self {
                        data: vec![Value::Object(map)],
                    }
                }
                None => Self {
                    data: vec![Value::Object(map)],
                },
            },
            Value::Array(rows) => Self { data: rows },
            Value::Null => Self::default(),
            other => Self { data: vec![other] },
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Request/response contract of the task HTTP API.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn start_task(&self, params: &ComputationParams) -> Result<StartTaskResponse, TransportError>;

    async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatusResponse, TransportError>;

    async fn task_result(&self, task: &TaskHandle) -> Result<Value, TransportError>;

    async fn group_progress(&self, group: &GroupHandle) -> Result<GroupProgress, TransportError>;

    async fn results(&self, params: &ComputationParams) -> Result<ResultsSnapshot, TransportError>;
}
