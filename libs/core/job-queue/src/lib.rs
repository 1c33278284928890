//! Job Queue
//!
//! Durable work queue built on AMQP 0-9-1 (RabbitMQ).
//!
//! ## Features
//!
//! - **Producer**: `JobProducer::submit` publishes one persistent job per call
//!   over a scoped connection and reports `QueueUnavailable` on any failure
//! - **Supervised consumer**: `ConnectionSupervisor` reconnects forever with a
//!   swappable `BackoffStrategy` and stops cleanly on shutdown
//! - **Fair dispatch**: `JobConsumer` holds at most one unacknowledged
//!   delivery (prefetch = 1) and acks only after the handler completes
//! - **Pluggable brokers**: `AmqpBroker` for RabbitMQ, `InMemoryBroker` with
//!   the same delivery semantics for tests
//! - **Health endpoints**: `/health`, `/ready` tied to the supervisor state,
//!   and `/metrics`
//!
//! ## Example
//!
//! ```ignore
//! use job_queue::{AmqpBroker, BrokerConfig, ConnectionSupervisor, JobConsumer, SimulatedWork};
//!
//! let config = BrokerConfig::from_env()?;
//! let broker = Arc::new(AmqpBroker::new(&config));
//!
//! let consumer = JobConsumer::new(config.queue_spec(), SimulatedWork::default());
//! let supervisor = ConnectionSupervisor::new(broker, config.queue.clone());
//! supervisor.run(&consumer, shutdown_rx).await;
//! ```

pub mod broker;
mod config;
mod consumer;
mod error;
mod handler;
mod health;
mod job;
pub mod metrics;
mod producer;
mod queue;
mod shutdown;
mod supervisor;

pub use broker::amqp::AmqpBroker;
pub use broker::memory::InMemoryBroker;
pub use broker::{Broker, BrokerChannel, BrokerConnection, DeliveryStream};
pub use config::BrokerConfig;
pub use consumer::{FAIR_DISPATCH_PREFETCH, HandlerFailurePolicy, JobConsumer};
pub use error::{ErrorCategory, QueueError};
pub use handler::{JobHandler, SimulatedWork};
pub use health::{HealthState, health_router};
pub use job::{Clock, DEFAULT_JOB_TYPE, Delivery, FixedClock, JobRecord, SystemClock, format_job_id};
pub use metrics::{JobOutcome, QueueMetrics};
pub use producer::{JobProducer, SubmissionResult};
pub use queue::QueueSpec;
pub use shutdown::wait_for_shutdown;
pub use supervisor::{
    BackoffStrategy, ConnectionSupervisor, ExponentialBackoff, FixedBackoff, Session,
    SupervisorState,
};
