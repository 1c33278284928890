//! # Axum Helpers
//!
//! Shared building blocks for the lab's Axum services.
//!
//! ## Modules
//!
//! - **[`server`]**: Router setup, health endpoint, graceful shutdown, cleanup
//! - **[`http`]**: CORS layers
//! - **[`errors`]**: Structured error responses with error codes
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let router = create_router::<ApiDoc>(api_routes, cors_layer_from_env()?)
//!     .merge(health_router(app_info!()));
//! create_production_app(router, &ServerConfig::default(), Duration::from_secs(30), async {}).await?;
//! ```

pub mod errors;
pub mod http;
pub mod server;

pub use server::{
    HealthResponse, ShutdownCoordinator, close_postgres, create_production_app, create_router,
    health_router, shutdown_signal,
};

pub use http::{cors_layer_from_env, create_cors_layer, create_permissive_cors_layer};

pub use errors::{AppError, ErrorCode, ErrorResponse};
