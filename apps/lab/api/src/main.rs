use axum_helpers::{close_postgres, cors_layer_from_env, create_production_app};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::common::RetryConfig;
use database::postgres::{connect_from_config_with_retry, connect_with_options};
use domain_messages::{MessageService, PgMessageRepository};
use eyre::WrapErr;
use job_queue::{AmqpBroker, JobProducer};
use lab_api::{AppState, config::Config};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 5 attempts, 2 seconds apart
const DB_CONNECT_RETRY: (u32, u64) = (4, 2_000);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);
    observability::init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    info!(
        app = config.app.name,
        version = config.app.version,
        broker = %config.broker.display_addr(),
        queue = %config.broker.queue,
        "Starting lab API"
    );

    let (retries, delay_ms) = DB_CONNECT_RETRY;
    let db = match connect_from_config_with_retry(
        config.database.clone(),
        Some(RetryConfig::fixed(retries, delay_ms)),
    )
    .await
    {
        Ok(db) => db,
        Err(e) => {
            // Keep serving: /api/status reports the database as disconnected
            // and queries reconnect through the pool once it comes back.
            warn!(error = %e, "PostgreSQL unreachable at startup, continuing with a lazy pool");
            let mut options = config.database.clone().into_connect_options();
            options.connect_lazy(true);
            connect_with_options(options)
                .await
                .wrap_err("Failed to create PostgreSQL pool")?
        }
    };

    let messages = MessageService::new(PgMessageRepository::new(db.clone()));
    if let Err(e) = messages.initialize().await {
        error!(error = %e, "Database initialization failed");
    }

    let broker = Arc::new(AmqpBroker::new(&config.broker));
    let producer = JobProducer::new(broker, config.broker.queue_spec());

    let cors = cors_layer_from_env()?;
    let router = lab_api::router(AppState::new(messages, producer), cors);

    create_production_app(
        router,
        &config.server,
        Duration::from_secs(30),
        close_postgres(db, "main"),
    )
    .await
    .wrap_err("Server error")?;

    info!("Lab API shut down gracefully");
    Ok(())
}
