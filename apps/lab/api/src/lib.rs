//! DevOps lab backend.
//!
//! Serves the messages API backed by PostgreSQL and publishes jobs to the
//! work queue consumed by `lab_worker`.

pub mod api;
pub mod config;
pub mod openapi;
pub mod state;

use axum::{Router, middleware, routing::get};
use axum_helpers::server::{create_router, health_router};
use core_config::app_info;
use domain_messages::MessageRepository;
use observability::{metrics_handler, middleware::metrics_middleware};
use tower_http::cors::CorsLayer;

pub use state::AppState;

/// Full application router: API routes, `/health`, `/metrics` and the
/// OpenAPI document, with request metrics on every matched route.
pub fn router<R: MessageRepository + 'static>(state: AppState<R>, cors: CorsLayer) -> Router {
    let routes = api::routes(state)
        .merge(health_router(app_info!()))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware));

    create_router::<openapi::ApiDoc>(routes, cors)
}
