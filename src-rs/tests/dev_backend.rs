use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use telemetry_tasks::api::DevServer;
use telemetry_tasks::task::Simulation;
use telemetry_tasks::{
    ComputationKind, ComputationParams, ComputationSlot, HttpTaskApi, PollingConfig, SlotState, TaskApi, TaskHandle,
    TransportError,
};

const WAIT: Duration = Duration::from_secs(10);

fn spawn_backend() -> SocketAddr {
    let simulation = Simulation {
        devices_per_client: 1,
        step: Duration::from_millis(5),
        max_client_id: 999,
    };
    let (addr, _server) = DevServer::new(0, simulation).spawn_ephemeral().unwrap();
    addr
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{}/api/v1", addr)
}

fn slot_for(addr: SocketAddr, params: ComputationParams) -> ComputationSlot {
    let interval = Duration::from_millis(20);
    let config = PollingConfig {
        api_base_url: base_url(addr),
        request_timeout: Duration::from_secs(5),
        ..PollingConfig::default()
    }
    .with_intervals(interval, interval, interval);
    let api = HttpTaskApi::new(&config.api_base_url, config.request_timeout).unwrap();
    ComputationSlot::with_params(Arc::new(api), config, params)
}

async fn wait_terminal(slot: &ComputationSlot) -> SlotState {
    let mut state = slot.subscribe_state();
    let terminal = tokio::time::timeout(WAIT, state.wait_for(|s| !s.is_running()))
        .await
        .expect("slot did not finish in time")
        .unwrap()
        .clone();
    terminal
}

#[tokio::test]
async fn breakdown_runs_end_to_end() {
    let addr = spawn_backend();
    let mut slot = slot_for(addr, ComputationParams::new(7, 2023, 2));

    slot.submit().await.unwrap();
    assert_eq!(wait_terminal(&slot).await, SlotState::Succeeded);

    // one device, 28 days, four of them without samples
    let snapshot = slot.snapshot().unwrap();
    assert_eq!(snapshot.len(), 24);
    assert!(snapshot.data.iter().all(|row| row["client_id"] == 7));
    assert!(snapshot.data[0].get("CO2_emissions").is_some());
    slot.teardown().await;
}

#[tokio::test]
async fn summary_runs_end_to_end() {
    let addr = spawn_backend();
    let params = ComputationParams::new(8, 2023, 2).with_kind(ComputationKind::MonthlySummary);
    let mut slot = slot_for(addr, params);

    slot.submit().await.unwrap();
    assert_eq!(wait_terminal(&slot).await, SlotState::Succeeded);

    let snapshot = slot.snapshot().unwrap();
    assert_eq!(snapshot.data[0]["status"], "Complete");
    assert_eq!(snapshot.data[0]["days_processed"], 24);
}

#[tokio::test]
async fn summary_for_unknown_client_fails() {
    let addr = spawn_backend();
    let params = ComputationParams::new(5000, 2023, 2).with_kind(ComputationKind::MonthlySummary);
    let mut slot = slot_for(addr, params);

    slot.submit().await.unwrap();
    assert_matches!(wait_terminal(&slot).await, SlotState::Failed(_));
}

#[tokio::test]
async fn api_errors_carry_status_codes() {
    let addr = spawn_backend();
    let api = HttpTaskApi::new(&base_url(addr), Duration::from_secs(5)).unwrap();

    let missing = api.task_status(&TaskHandle::new("missing")).await;
    assert_matches!(missing, Err(TransportError::Api { status: 404, .. }));

    let invalid = api.start_task(&ComputationParams::new(7, 2023, 13)).await;
    assert_matches!(invalid, Err(TransportError::Api { status: 422, .. }));

    let health = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert!(health.status().is_success());
}
