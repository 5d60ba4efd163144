//! Simulated calculation workers.
//!
//! Samples are synthesized per device-day so the backend behaves the same
//! on every run without a meter database behind it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde_json::json;

use super::store::TaskStore;
use super::types::{EmissionRow, GroupRecord, TaskRecord};
use crate::co2::{daily_emissions, daily_energy_kwh, PowerSample};

const NOT_FOUND: &str = "Client or devices not found.";

#[derive(Clone, Copy, Debug)]
pub struct Simulation {
    pub devices_per_client: u32,
    /// Time each sub-task takes.
    pub step: Duration,
    /// Clients above this id have no devices.
    pub max_client_id: i64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            devices_per_client: 2,
            step: Duration::from_millis(200),
            max_client_id: 999,
        }
    }
}

impl Simulation {
    pub fn devices_for(&self, client_id: i64) -> u32 {
        if client_id <= 0 || client_id > self.max_client_id {
            0
        } else {
            self.devices_per_client
        }
    }
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

pub fn device_serial(client_id: i64, index: u32) -> String {
    format!("GV{:03}{:02}", client_id, index)
}

/// Half-hourly samples from 06:00 to 18:00. Some device-days report nothing.
fn synthetic_samples(index: u32, date: NaiveDate) -> Vec<PowerSample> {
    let day = date.day();
    if (index + day) % 7 == 0 {
        return Vec::new();
    }
    let current = 0.5 + f64::from((index * 7 + day) % 10) * 0.15;
    let Some(start) = date.and_hms_opt(6, 0, 0) else {
        return Vec::new();
    };
    let start = Utc.from_utc_datetime(&start);
    (0..=24)
        .map(|slot| PowerSample::new(start + chrono::Duration::minutes(30 * slot), 24.0, current))
        .collect()
}

pub fn compute_day(client_id: i64, index: u32, year: i32, month: u32, day: u32) -> Option<EmissionRow> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let samples = synthetic_samples(index, date);
    if samples.is_empty() {
        return None;
    }
    let energy = daily_energy_kwh(&samples);
    Some(EmissionRow {
        client_id,
        serial: device_serial(client_id, index),
        year,
        month,
        day,
        energy_per_day: energy,
        co2_emissions: daily_emissions(energy),
    })
}

/// Fan a monthly breakdown out into one sub-task per device-day.
pub fn spawn_breakdown(
    store: Arc<TaskStore>,
    simulation: Simulation,
    client_id: i64,
    year: i32,
    month: u32,
) -> GroupRecord {
    let devices = simulation.devices_for(client_id);
    let days = days_in_month(year, month).unwrap_or(0);
    let group = store.create_group(u64::from(devices) * u64::from(days));
    tracing::info!(group_id = %group.id, client_id, year, month, total = group.total, "Breakdown started");

    let group_id = group.id.clone();
    tokio::spawn(async move {
        for index in 1..=devices {
            for day in 1..=days {
                tokio::time::sleep(simulation.step).await;
                let row = compute_day(client_id, index, year, month, day);
                store.record_subtask(&group_id, row);
            }
        }
        tracing::info!(group_id = %group_id, "Breakdown finished");
    });
    group
}

/// Run a monthly summary as a single task.
pub fn spawn_summary(
    store: Arc<TaskStore>,
    simulation: Simulation,
    client_id: i64,
    year: i32,
    month: u32,
) -> TaskRecord {
    let task = store.create_task();
    tracing::info!(task_id = %task.id, client_id, year, month, "Summary started");

    let task_id = task.id.clone();
    tokio::spawn(async move {
        let devices = simulation.devices_for(client_id);
        if devices == 0 {
            tokio::time::sleep(simulation.step).await;
            store.finish_task(&task_id, Err(NOT_FOUND.to_string()));
            tracing::warn!(task_id = %task_id, client_id, "Summary failed: {}", NOT_FOUND);
            return;
        }

        let days = days_in_month(year, month).unwrap_or(0);
        let mut days_processed = 0u32;
        let mut total_co2 = 0.0;
        for index in 1..=devices {
            tokio::time::sleep(simulation.step).await;
            for day in 1..=days {
                let Some(row) = compute_day(client_id, index, year, month, day) else {
                    continue;
                };
                let co2 = row.co2_emissions;
                if store.insert_row(row) {
                    days_processed += 1;
                    total_co2 += co2;
                }
            }
        }

        store.finish_task(
            &task_id,
            Ok(json!({
                "status": "Complete",
                "client_id": client_id,
                "year": year,
                "month": month,
                "days_processed": days_processed,
                "total_co2": total_co2,
            })),
        );
        tracing::info!(task_id = %task_id, days_processed, "Summary finished");
    });
    task
}
