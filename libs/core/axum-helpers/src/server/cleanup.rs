//! Connection cleanup during graceful shutdown.

use tracing::{error, info};

/// Close a SeaORM pool, logging the outcome.
///
/// ```ignore
/// create_production_app(router, &config, timeout, close_postgres(db, "main")).await?;
/// ```
pub async fn close_postgres(db: sea_orm::DatabaseConnection, name: &str) {
    match db.close().await {
        Ok(()) => info!(pool = name, "PostgreSQL pool closed"),
        Err(e) => error!(pool = name, error = %e, "Error closing PostgreSQL pool"),
    }
}
