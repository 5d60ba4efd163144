use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::task::JoinHandle;

use crate::api::handlers::{
    handle_group_progress, handle_health, handle_monthly_results, handle_start_breakdown, handle_start_summary,
    handle_task_result, handle_task_status, AppState,
};
use crate::task::Simulation;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/co2/monthly-co2", get(handle_monthly_results))
        .route("/co2/monthly-co2/start", post(handle_start_breakdown))
        .route("/co2/monthly-co2/summary/start", post(handle_start_summary))
        .route("/tasks/:task_id/status", get(handle_task_status))
        .route("/tasks/:task_id/result", get(handle_task_result))
        .route("/tasks/groups/:group_id/progress", get(handle_group_progress));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api/v1", api)
        .with_state(state)
}

/// In-memory stand-in for the dashboard backend.
pub struct DevServer {
    pub port: u16,
    pub state: AppState,
}

impl DevServer {
    pub fn new(port: u16, simulation: Simulation) -> Self {
        Self {
            port,
            state: AppState::new(simulation),
        }
    }

    pub async fn start(&self) -> Result<(), String> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let server = axum::Server::try_bind(&addr)
            .map_err(|err| err.to_string())?
            .serve(router(self.state.clone()).into_make_service());
        tracing::info!(addr = %server.local_addr(), "Development backend listening");
        server.await.map_err(|err| err.to_string())
    }

    /// Serve on a random loopback port in the background.
    pub fn spawn_ephemeral(self) -> Result<(SocketAddr, JoinHandle<()>), String> {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = axum::Server::try_bind(&addr)
            .map_err(|err| err.to_string())?
            .serve(router(self.state).into_make_service());
        let local = server.local_addr();
        let handle = tokio::spawn(async move {
            if let Err(err) = server.await {
                tracing::error!(error = %err, "Development backend stopped");
            }
        });
        Ok((local, handle))
    }
}
