use super::shutdown::ShutdownCoordinator;
use crate::errors::not_found;
use axum::{Json, Router, routing::get};
use core_config::server::ServerConfig;
use std::io;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;

/// Where the OpenAPI document is served
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Wrap `routes` with the OpenAPI document, a JSON 404 fallback, request
/// tracing and `cors`.
///
/// Routes are merged at the root: the lab API serves `/job` and `/api/*`
/// side by side.
pub fn create_router<T>(routes: Router, cors: CorsLayer) -> Router
where
    T: OpenApi + 'static,
{
    let openapi = T::openapi();

    Router::new()
        .route(OPENAPI_JSON_PATH, get(move || async move { Json(openapi) }))
        .merge(routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
}

/// Serve `router` until SIGINT/SIGTERM, then run `cleanup` within
/// `shutdown_timeout`.
///
/// ```ignore
/// let cleanup = async move { close_postgres(db, "main").await };
/// create_production_app(router, &config, Duration::from_secs(30), cleanup).await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    shutdown_timeout: Duration,
    cleanup: F,
) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let coordinator = ShutdownCoordinator::default();
    let signal_handle = coordinator.clone();
    let mut shutdown_rx = coordinator.subscribe();

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    tokio::spawn(async move { signal_handle.wait_for_signal().await });

    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        });

    info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, cleanup).await {
        Ok(()) => info!("Cleanup completed successfully"),
        Err(_) => warn!(
            "Cleanup exceeded timeout of {:?}, forcing shutdown",
            shutdown_timeout
        ),
    }

    serve_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi(info(title = "test api"))]
    struct TestDoc;

    fn app() -> Router {
        let routes = Router::new().route("/ping", get(|| async { "pong" }));
        create_router::<TestDoc>(routes, crate::create_permissive_cors_layer())
    }

    #[tokio::test]
    async fn test_routes_are_merged_at_root() {
        let response = app()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(OPENAPI_JSON_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["info"]["title"], "test api");
    }

    #[tokio::test]
    async fn test_unknown_route_gets_json_404() {
        let response = app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_permissive_cors_echoes_any_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("origin", "http://frontend.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
