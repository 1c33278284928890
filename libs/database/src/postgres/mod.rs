//! PostgreSQL connector and health checks

mod config;
mod connector;
mod health;

pub use config::{PostgresConfig, PostgresParts};
pub use connector::{
    connect, connect_from_config, connect_from_config_with_retry, connect_with_options,
};
pub use health::{HealthStatus, check_health, check_health_detailed};

// Re-export SeaORM types for convenience
pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
