//! `telemetry-backend` -- in-memory development backend.
//!
//! Serves the task, group and results endpoints the dashboard polls, with
//! simulated CO2 workers behind them.
//!
//! | Variable             | Default | Description                        |
//! |----------------------|---------|------------------------------------|
//! | `PORT`               | `8000`  | Listen port                        |
//! | `DEVICES_PER_CLIENT` | `2`     | Simulated devices per known client |
//! | `SIMULATION_STEP_MS` | `200`   | Time one device-day sub-task takes |
//! | `MAX_CLIENT_ID`      | `999`   | Higher client ids have no devices  |

use std::env;
use std::time::Duration;

use telemetry_tasks::api::DevServer;
use telemetry_tasks::task::Simulation;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.parse::<T>().ok())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemetry_tasks=info,telemetry_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = env_parse::<u16>("PORT").unwrap_or(8000);
    let defaults = Simulation::default();
    let simulation = Simulation {
        devices_per_client: env_parse("DEVICES_PER_CLIENT").unwrap_or(defaults.devices_per_client),
        step: env_parse("SIMULATION_STEP_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.step),
        max_client_id: env_parse("MAX_CLIENT_ID").unwrap_or(defaults.max_client_id),
    };

    tracing::info!(
        port,
        devices_per_client = simulation.devices_per_client,
        step_ms = simulation.step.as_millis() as u64,
        "Starting development backend",
    );

    let server = DevServer::new(port, simulation);
    if let Err(err) = server.start().await {
        tracing::error!(error = %err, "Server error");
        std::process::exit(1);
    }
}
