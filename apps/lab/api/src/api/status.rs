use axum::{Json, Router, extract::State, routing::get};
use domain_messages::{DatabaseStatus, MessageRepository, MessageService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "running")]
    pub api: String,
    pub database: DatabaseStatus,
    #[schema(example = "1.0.0")]
    pub version: String,
}

/// API and database status
///
/// Always 200: an unreachable database is reported, not raised.
#[utoipa::path(
    get,
    path = "/status",
    tag = "lab",
    responses((status = 200, description = "Current status", body = StatusResponse))
)]
pub async fn status<R: MessageRepository>(
    State(service): State<Arc<MessageService<R>>>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        api: "running".to_string(),
        database: service.database_status().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Routes relative to the `/api` prefix
pub fn router<R: MessageRepository + 'static>(service: MessageService<R>) -> Router {
    Router::new()
        .route("/status", get(status::<R>))
        .with_state(Arc::new(service))
}
