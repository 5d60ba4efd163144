//! Per-day energy and CO2 figures for one device.

use chrono::{DateTime, Utc};

const TIER_ONE_KWH: f64 = 0.1505817;
const TIER_TWO_KWH: f64 = 0.684462;
const TIER_ONE_FACTOR: f64 = 0.0068;
const TIER_TWO_FACTOR: f64 = 0.0013;
const TIER_THREE_FACTOR: f64 = 0.001;

/// Samples further apart than this do not contribute energy.
const MAX_SAMPLE_GAP_HOURS: f64 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct PowerSample {
    pub time: DateTime<Utc>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
}

impl PowerSample {
    pub fn new(time: DateTime<Utc>, voltage: f64, current: f64) -> Self {
        Self {
            time,
            voltage: Some(voltage),
            current: Some(current),
        }
    }
}

/// Energy in kWh for samples ordered by time.
///
/// Each interval uses the power of its later sample. Missing readings count
/// as zero and non-finite contributions are skipped.
pub fn daily_energy_kwh(samples: &[PowerSample]) -> f64 {
    let watt_hours: f64 = samples
        .windows(2)
        .filter_map(|pair| {
            let hours = (pair[1].time - pair[0].time).num_milliseconds() as f64 / 3_600_000.0;
            if hours > MAX_SAMPLE_GAP_HOURS {
                return None;
            }
            let voltage = pair[1].voltage.unwrap_or(0.0);
            let current = pair[1].current.unwrap_or(0.0);
            let energy = voltage * current * hours;
            energy.is_finite().then_some(energy)
        })
        .sum();
    watt_hours / 1000.0
}

/// Tiered CO2 emissions for one day's consumption.
pub fn daily_emissions(kwh: f64) -> f64 {
    if kwh <= TIER_ONE_KWH {
        kwh * TIER_ONE_FACTOR
    } else if kwh <= TIER_TWO_KWH {
        (kwh - TIER_ONE_KWH) * TIER_TWO_FACTOR + TIER_ONE_KWH * TIER_ONE_FACTOR
    } else {
        (kwh - TIER_TWO_KWH) * TIER_THREE_FACTOR
            + TIER_ONE_KWH * TIER_ONE_FACTOR
            + (TIER_TWO_KWH - TIER_ONE_KWH) * TIER_TWO_FACTOR
    }
}
