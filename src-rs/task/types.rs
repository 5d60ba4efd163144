use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{GroupProgress, TaskStatus};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub total: u64,
    pub completed: u64,
    pub created_at: DateTime<Utc>,
}

impl GroupRecord {
    pub fn progress(&self) -> GroupProgress {
        if self.completed >= self.total {
            GroupProgress::complete(self.completed, self.total)
        } else {
            GroupProgress::active(self.completed, self.total)
        }
    }
}

/// One device-day of computed emissions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmissionRow {
    pub client_id: i64,
    pub serial: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub energy_per_day: f64,
    #[serde(rename = "CO2_emissions")]
    pub co2_emissions: f64,
}

impl EmissionRow {
    /// Key used to skip device-days that were already calculated.
    pub fn unique_id(&self) -> String {
        format!(
            "CCO2A{}A{}A{}A{}A{}",
            self.client_id, self.serial, self.year, self.month, self.day
        )
    }
}
