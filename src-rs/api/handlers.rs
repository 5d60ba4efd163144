use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::TaskStatus;
use crate::task::{worker, Simulation, TaskStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TaskStore>,
    pub simulation: Simulation,
}

impl AppState {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            store: Arc::new(TaskStore::new()),
            simulation,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalculationRequest {
    pub client_id: i64,
    pub year: i32,
    pub month: u32,
}

impl CalculationRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.client_id <= 0 {
            return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "client_id is required"));
        }
        if !(1..=12).contains(&self.month) {
            return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "month must be between 1 and 12"));
        }
        Ok(())
    }
}

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult = Result<Json<Value>, ApiError>;

fn error(status: StatusCode, detail: &str) -> ApiError {
    (status, Json(json!({"detail": detail})))
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub async fn handle_start_breakdown(State(state): State<AppState>, Json(req): Json<CalculationRequest>) -> ApiResult {
    req.validate()?;
    let group = worker::spawn_breakdown(
        Arc::clone(&state.store),
        state.simulation,
        req.client_id,
        req.year,
        req.month,
    );
    Ok(Json(json!({"group_id": group.id})))
}

pub async fn handle_start_summary(State(state): State<AppState>, Json(req): Json<CalculationRequest>) -> ApiResult {
    req.validate()?;
    let task = worker::spawn_summary(
        Arc::clone(&state.store),
        state.simulation,
        req.client_id,
        req.year,
        req.month,
    );
    Ok(Json(json!({"task_id": task.id})))
}

pub async fn handle_task_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult {
    let task = state
        .store
        .task(&task_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "task not found"))?;
    Ok(Json(json!({
        "task_id": task.id,
        "status": task.status,
        "result": task.result,
    })))
}

pub async fn handle_task_result(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult {
    let task = state
        .store
        .task(&task_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "task not found"))?;
    match (task.status, task.result) {
        (TaskStatus::Success, Some(result)) => Ok(Json(result)),
        (TaskStatus::Failure, _) => Err(error(
            StatusCode::CONFLICT,
            task.error.as_deref().unwrap_or("task failed"),
        )),
        _ => Err(error(StatusCode::CONFLICT, "task has not finished")),
    }
}

pub async fn handle_group_progress(State(state): State<AppState>, Path(group_id): Path<String>) -> ApiResult {
    let group = state
        .store
        .group(&group_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "group not found"))?;
    Ok(Json(json!(group.progress())))
}

pub async fn handle_monthly_results(
    State(state): State<AppState>,
    Query(query): Query<CalculationRequest>,
) -> ApiResult {
    query.validate()?;
    let rows = state.store.rows_for(query.client_id, query.year, query.month);
    Ok(Json(json!({"data": rows})))
}
