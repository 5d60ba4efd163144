use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;

use super::types::{EmissionRow, GroupRecord, TaskRecord};
use crate::client::{GroupProgress, TaskStatus};

static COUNTER: AtomicUsize = AtomicUsize::new(1);

/// In-memory task, group and result storage for the development backend.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    groups: RwLock<HashMap<String, GroupRecord>>,
    rows: RwLock<Vec<EmissionRow>>,
    logged: RwLock<HashSet<String>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_task(&self) -> TaskRecord {
        let id = next_id("task");
        let task = TaskRecord {
            id: id.clone(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        if let Ok(mut map) = self.tasks.write() {
            map.insert(id, task.clone());
        }
        task
    }

    pub fn finish_task(&self, id: &str, outcome: Result<Value, String>) -> Option<TaskRecord> {
        let mut map = self.tasks.write().ok()?;
        let task = map.get_mut(id)?;
        match outcome {
            Ok(result) => {
                task.status = TaskStatus::Success;
                task.result = Some(result);
            }
            Err(error) => {
                task.status = TaskStatus::Failure;
                task.error = Some(error);
            }
        }
        task.completed_at = Some(Utc::now());
        Some(task.clone())
    }

    pub fn task(&self, id: &str) -> Option<TaskRecord> {
        let map = self.tasks.read().ok()?;
        map.get(id).cloned()
    }

    pub fn create_group(&self, total: u64) -> GroupRecord {
        let id = next_id("group");
        let group = GroupRecord {
            id: id.clone(),
            total,
            completed: 0,
            created_at: Utc::now(),
        };
        if let Ok(mut map) = self.groups.write() {
            map.insert(id, group.clone());
        }
        group
    }

    /// Mark one sub-task of `group_id` finished, storing its row if any.
    pub fn record_subtask(&self, group_id: &str, row: Option<EmissionRow>) -> Option<GroupProgress> {
        if let Some(row) = row {
            self.insert_row(row);
        }
        let mut map = self.groups.write().ok()?;
        let group = map.get_mut(group_id)?;
        group.completed = (group.completed + 1).min(group.total);
        Some(group.progress())
    }

    pub fn group(&self, id: &str) -> Option<GroupRecord> {
        let map = self.groups.read().ok()?;
        map.get(id).cloned()
    }

    /// Store `row` unless its device-day was already calculated.
    pub fn insert_row(&self, row: EmissionRow) -> bool {
        let fresh = match self.logged.write() {
            Ok(mut logged) => logged.insert(row.unique_id()),
            Err(_) => return false,
        };
        if fresh {
            if let Ok(mut rows) = self.rows.write() {
                rows.push(row);
            }
        }
        fresh
    }

    pub fn rows_for(&self, client_id: i64, year: i32, month: u32) -> Vec<EmissionRow> {
        let rows = match self.rows.read() {
            Ok(lock) => lock,
            Err(_) => return vec![],
        };
        let mut items: Vec<EmissionRow> = rows
            .iter()
            .filter(|row| row.client_id == client_id && row.year == year && row.month == month)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.serial.cmp(&b.serial)));
        items
    }
}

fn next_id(prefix: &str) -> String {
    let count = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), count)
}
