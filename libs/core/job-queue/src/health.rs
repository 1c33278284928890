//! Health check handlers for queue workers.
//!
//! - `/health`: liveness, always 200 while the process serves HTTP
//! - `/ready`: readiness, 200 only while the supervisor holds a live session
//! - `/metrics`: Prometheus exposition

use crate::supervisor::SupervisorState;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use core_config::AppInfo;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::watch;

/// Shared state for worker health endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub app: AppInfo,
    pub queue: String,
    pub supervisor: watch::Receiver<SupervisorState>,
}

impl HealthState {
    pub fn new(
        app: AppInfo,
        queue: impl Into<String>,
        supervisor: watch::Receiver<SupervisorState>,
    ) -> Self {
        Self {
            app,
            queue: queue.into(),
            supervisor,
        }
    }
}

/// Health response for liveness probes.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app.name,
        version: state.app.version,
    })
}

async fn ready_handler(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    let current = *state.supervisor.borrow();
    let ready = current == SupervisorState::Running;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if ready { "ready" } else { "not ready" },
        "broker": current.to_string(),
        "queue": state.queue,
    });

    (status, Json(body))
}

/// Router with `/health`, `/ready` and `/metrics`.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(observability::metrics_handler))
        .with_state(state)
}
