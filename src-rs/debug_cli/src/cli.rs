use std::env;

use telemetry_tasks::{ComputationKind, ComputationParams, PollingConfig};

use crate::models::CLIConfig;

pub fn parse_config() -> CLIConfig {
    let mut cfg = CLIConfig {
        polling: PollingConfig::from_env(),
        params: ComputationParams::default(),
    };
    if let Some(client_id) = env_parse::<i64>("DASHBOARD_CLIENT_ID") {
        cfg.params.client_id = client_id;
    }

    let args: Vec<String> = env::args().collect();
    let mut idx = 1;
    while idx < args.len() {
        let value = args.get(idx + 1);
        match (args[idx].as_str(), value) {
            ("--base", Some(value)) => {
                cfg.polling.api_base_url = value.clone();
                idx += 1;
            }
            ("--client", Some(value)) => {
                if let Ok(parsed) = value.parse::<i64>() {
                    cfg.params.client_id = parsed;
                }
                idx += 1;
            }
            ("--year", Some(value)) => {
                if let Ok(parsed) = value.parse::<i32>() {
                    cfg.params.year = parsed;
                }
                idx += 1;
            }
            ("--month", Some(value)) => {
                if let Ok(parsed) = value.parse::<u32>() {
                    cfg.params.month = parsed;
                }
                idx += 1;
            }
            ("--kind", Some(value)) => {
                if let Some(kind) = parse_kind(value) {
                    cfg.params.kind = kind;
                }
                idx += 1;
            }
            _ => {}
        }
        idx += 1;
    }

    cfg
}

pub fn parse_kind(value: &str) -> Option<ComputationKind> {
    match value.to_lowercase().as_str() {
        "breakdown" | "daily" => Some(ComputationKind::MonthlyBreakdown),
        "summary" => Some(ComputationKind::MonthlySummary),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse::<T>().ok(),
        _ => None,
    }
}
