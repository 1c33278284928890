use utoipa::OpenApi;

use crate::api::{jobs, root, status};

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    info(title = "DevOps Lab Backend API"),
    paths(root::root, jobs::create_job),
    components(schemas(
        root::RootResponse,
        job_queue::SubmissionResult,
        axum_helpers::ErrorResponse,
        axum_helpers::HealthResponse,
    )),
    nest(
        (path = "/api", api = domain_messages::MessagesApiDoc),
        (path = "/api", api = StatusApiDoc),
    ),
    tags(
        (name = "lab", description = "Service status"),
        (name = "jobs", description = "Work queue submission")
    )
)]
pub struct ApiDoc;

/// `/api/status`, nested under the same prefix as the messages routes
#[derive(OpenApi)]
#[openapi(
    paths(status::status),
    components(schemas(status::StatusResponse, domain_messages::DatabaseStatus))
)]
pub struct StatusApiDoc;
