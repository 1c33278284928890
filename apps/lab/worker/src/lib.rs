//! Lab Worker
//!
//! Consumes the durable work queue one job at a time.
//!
//! ## Architecture
//!
//! ```text
//! RabbitMQ (work_queue, durable)
//!   ↓ prefetch = 1, manual ack
//! ConnectionSupervisor (reconnects every JOB_RETRY_DELAY_SECS)
//!   ↓
//! JobConsumer<SimulatedWork>
//!   ↓ ack after the handler returns
//! ```
//!
//! Run more worker processes to scale; the broker spreads jobs across them.

mod settings;

pub use settings::WorkerSettings;

use axum_helpers::shutdown_signal;
use core_config::{Environment, FromEnv, app_info};
use eyre::{Result, WrapErr};
use job_queue::{
    AmqpBroker, Broker, BrokerConfig, ConnectionSupervisor, FixedBackoff, HealthState, JobConsumer,
    QueueSpec, SimulatedWork, SupervisorState, health_router, wait_for_shutdown,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// Supervisor and consumer for one worker process.
pub struct Worker {
    supervisor: ConnectionSupervisor,
    consumer: JobConsumer<SimulatedWork>,
}

impl Worker {
    pub fn new(broker: Arc<dyn Broker>, queue: QueueSpec, settings: &WorkerSettings) -> Self {
        let supervisor = ConnectionSupervisor::new(broker, queue.name.clone())
            .with_backoff(FixedBackoff(settings.retry_delay));
        let consumer = JobConsumer::new(queue, SimulatedWork::new(settings.work_duration))
            .with_failure_policy(settings.failure_policy);

        Self {
            supervisor,
            consumer,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.supervisor.subscribe()
    }

    /// Consume until `shutdown` flips to true. Unacknowledged work is left to
    /// broker redelivery.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        self.supervisor.run(&self.consumer, shutdown).await;
    }
}

async fn start_health_server(
    state: HealthState,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, health_router(state))
        .with_graceful_shutdown(async move { wait_for_shutdown(&mut shutdown).await })
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the worker
///
/// 1. Sets up structured logging and the Prometheus recorder
/// 2. Loads broker and worker settings (every value has a default)
/// 3. Serves health endpoints on `HEALTH_PORT`
/// 4. Consumes until SIGINT/SIGTERM, then returns `Ok(())`
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    observability::init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting lab worker");

    let broker_config =
        BrokerConfig::from_env().wrap_err("Failed to load broker configuration")?;
    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker settings")?;
    info!(
        broker = %broker_config.display_addr(),
        queue = %broker_config.queue,
        work_duration_ms = settings.work_duration.as_millis() as u64,
        retry_delay_secs = settings.retry_delay.as_secs(),
        failure_policy = %settings.failure_policy,
        "Worker configuration loaded"
    );

    let broker = Arc::new(AmqpBroker::new(&broker_config));
    let worker = Worker::new(broker, broker_config.queue_spec(), &settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let health_state = HealthState::new(app_info, broker_config.queue.clone(), worker.subscribe());
    let health_port = settings.health_port;
    let health_shutdown = shutdown_rx.clone();
    let health_server = tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port, health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    worker.run(shutdown_rx).await;

    if let Err(e) = health_server.await {
        error!(error = %e, "Health server task panicked");
    }

    info!("Lab worker stopped");
    Ok(())
}
