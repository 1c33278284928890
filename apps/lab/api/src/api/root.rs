use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "DevOps Lab Backend API")]
    pub message: String,
    #[schema(example = "running")]
    pub status: String,
}

/// API banner
#[utoipa::path(
    get,
    path = "/",
    tag = "lab",
    responses((status = 200, description = "API is running", body = RootResponse))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "DevOps Lab Backend API".to_string(),
        status: "running".to_string(),
    })
}
