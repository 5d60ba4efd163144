mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use common::{params, settle, Call, ScriptedApi};
use telemetry_tasks::poll::{PollSession, ResultsStreamer};
use telemetry_tasks::{ComputationParams, ResultsSnapshot};

fn is_results(call: &Call) -> bool {
    matches!(call, Call::Results(_))
}

struct Harness {
    api: Arc<ScriptedApi>,
    parent: CancellationToken,
    params: watch::Sender<ComputationParams>,
    active: watch::Sender<bool>,
    snapshots: mpsc::UnboundedReceiver<Option<ResultsSnapshot>>,
    session: PollSession,
}

fn start(api: ScriptedApi, initial: ComputationParams) -> Harness {
    let api = Arc::new(api);
    let parent = CancellationToken::new();
    let (params, params_rx) = watch::channel(initial);
    let (active, active_rx) = watch::channel(false);
    let (tx, snapshots) = mpsc::unbounded_channel();
    let session = ResultsStreamer::new(api.clone(), Duration::from_secs(7)).start(params_rx, active_rx, &parent, tx);
    Harness {
        api,
        parent,
        params,
        active,
        snapshots,
        session,
    }
}

#[tokio::test(start_paused = true)]
async fn idle_until_activated() {
    let mut h = start(ScriptedApi::new(), params());
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.api.count(is_results), 0);
    assert!(!h.session.is_active());

    h.active.send_replace(true);
    assert_matches!(h.snapshots.recv().await, Some(Some(_)));
    assert!(h.session.is_active());
    assert_eq!(h.api.times_of(is_results), vec![30]);
}

#[tokio::test(start_paused = true)]
async fn failed_tick_is_invisible() {
    let api = ScriptedApi::new()
        .results_error(500)
        .results(vec![json!({"day": 1, "CO2_emissions": 0.002})]);
    let mut h = start(api, params());

    h.active.send_replace(true);
    let first = h.snapshots.recv().await;

    assert_matches!(first, Some(Some(snapshot)) if snapshot.len() == 1 && snapshot.data[0]["day"] == 1);
    assert_eq!(h.api.times_of(is_results), vec![0, 7]);
    assert!(h.snapshots.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn every_tick_reads_current_params() {
    let mut h = start(ScriptedApi::new(), params());

    h.active.send_replace(true);
    assert_matches!(h.snapshots.recv().await, Some(Some(_)));
    h.params.send_modify(|p| p.month = 6);
    assert_matches!(h.snapshots.recv().await, Some(Some(_)));

    let months: Vec<u32> = h
        .api
        .calls()
        .into_iter()
        .filter_map(|(_, call)| match call {
            Call::Results(p) => Some(p.month),
            _ => None,
        })
        .collect();
    assert_eq!(months, vec![5, 6]);
}

#[tokio::test(start_paused = true)]
async fn deactivation_discards_in_flight_response() {
    let api = ScriptedApi::new()
        .with_latency(Duration::from_secs(3))
        .results(vec![json!({"day": 1})])
        .results(vec![json!({"day": 1}), json!({"day": 2})])
        .results(vec![json!({"day": 3})]);
    let mut h = start(api, params());

    h.active.send_replace(true);
    assert_matches!(h.snapshots.recv().await, Some(Some(s)) if s.len() == 1);

    // second request goes out at 7 and would land at 10
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.active.send_replace(false);
    settle().await;
    assert!(!h.session.is_active());

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(h.snapshots.try_recv().is_err());

    h.active.send_replace(true);
    assert_matches!(h.snapshots.recv().await, Some(Some(s)) if s.data[0]["day"] == 3);
    assert_eq!(h.api.times_of(is_results), vec![0, 7, 20]);
}

#[tokio::test(start_paused = true)]
async fn unqueryable_params_yield_empty_snapshot() {
    let mut h = start(ScriptedApi::new(), ComputationParams::new(0, 2024, 5));

    h.active.send_replace(true);
    assert_matches!(h.snapshots.recv().await, Some(None));
    assert_eq!(h.api.count(is_results), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_streaming() {
    let api = ScriptedApi::new().with_latency(Duration::from_secs(2));
    let mut h = start(api, params());

    h.active.send_replace(true);
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.parent.cancel();
    h.session.finished().await;

    assert!(h.snapshots.recv().await.is_none());
    assert_eq!(h.api.count(is_results), 1);
}
