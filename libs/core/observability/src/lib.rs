//! Observability utilities for the lab services.
//!
//! This crate provides:
//! - Prometheus recorder installation and text exposition
//! - Axum middleware that counts HTTP requests per endpoint
//! - Database query counters shared by the repositories
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{middleware, routing::get, Router};
//! use observability::{init_metrics, metrics_handler, middleware::metrics_middleware};
//!
//! init_metrics()?;
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler))
//!     .layer(middleware::from_fn(metrics_middleware));
//! ```

pub mod database;
pub mod middleware;

pub use database::{DbMetrics, QueryStatus};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder.
///
/// Call once at startup; later calls return the handle installed first.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render the current metrics in Prometheus text format.
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    render_metrics()
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!("http_requests_total", "Total HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    describe_counter!("db_query_total", "Total database queries");

    describe_counter!(
        "jobs_published_total",
        "Jobs published to the work queue by outcome"
    );
    describe_counter!(
        "jobs_processed_total",
        "Jobs consumed from the work queue by outcome"
    );
    describe_histogram!(
        "job_duration_seconds",
        "Time spent in the job handler in seconds"
    );
    describe_counter!(
        "broker_reconnects_total",
        "Consumer sessions that ended and were retried"
    );
    describe_gauge!(
        "broker_connected",
        "1 while the consumer holds a live broker session"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_handler_before_and_after_init() {
        if get_metrics_handle().is_none() {
            assert!(metrics_handler().await.starts_with("# Metrics not initialized"));
        }

        init_metrics().unwrap();
        DbMetrics::record("select", QueryStatus::Success);

        let body = metrics_handler().await;
        assert!(body.contains("db_query_total"));
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        let first = init_metrics().unwrap() as *const PrometheusHandle;
        let second = init_metrics().unwrap() as *const PrometheusHandle;
        assert_eq!(first, second);
    }
}
