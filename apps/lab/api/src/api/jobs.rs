use axum::{
    Json, Router,
    extract::{Query, State},
    routing::post,
};
use axum_helpers::AppError;
use job_queue::{JobProducer, SubmissionResult};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobQuery {
    /// Job label (default "scaling_test")
    pub job_type: Option<String>,
}

/// Publish one job to the work queue
///
/// No retry: a broker failure is reported immediately as a 500.
#[utoipa::path(
    post,
    path = "/job",
    tag = "jobs",
    params(JobQuery),
    responses(
        (status = 200, description = "Job queued", body = SubmissionResult),
        (status = 500, description = "Broker unreachable or publish failed", body = axum_helpers::ErrorResponse)
    )
)]
pub async fn create_job(
    State(producer): State<JobProducer>,
    Query(query): Query<JobQuery>,
) -> Result<Json<SubmissionResult>, AppError> {
    producer
        .submit(query.job_type.as_deref())
        .await
        .map(Json)
        .map_err(|e| AppError::Queue(e.reason()))
}

pub fn router(producer: JobProducer) -> Router {
    Router::new()
        .route("/job", post(create_job))
        .with_state(producer)
}
