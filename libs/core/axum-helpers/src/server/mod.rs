//! Server infrastructure module.
//!
//! - Router setup with the OpenAPI document and common middleware
//! - Liveness endpoint
//! - Graceful shutdown coordination
//! - Database connection cleanup
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::{server::ServerConfig, app_info};
//!
//! let app = create_router::<ApiDoc>(api_routes, cors_layer_from_env()?)
//!     .merge(health_router(app_info!()));
//! create_production_app(app, &ServerConfig::default(), Duration::from_secs(30), cleanup).await?;
//! ```

pub mod app;
pub mod cleanup;
pub mod health;
pub mod shutdown;

pub use app::{OPENAPI_JSON_PATH, create_production_app, create_router};
pub use cleanup::close_postgres;
pub use health::{HealthResponse, health_router};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
