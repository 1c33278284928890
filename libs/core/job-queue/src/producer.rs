//! Job producer
//!
//! Used by the HTTP layer to queue one job per request.
//!
//! # Example
//!
//! ```rust,ignore
//! use job_queue::{AmqpBroker, BrokerConfig, JobProducer};
//!
//! let config = BrokerConfig::from_env()?;
//! let producer = JobProducer::new(Arc::new(AmqpBroker::new(&config)), config.queue_spec());
//!
//! let result = producer.submit(Some("scaling_test")).await?;
//! assert_eq!(result.status, "queued");
//! ```

use crate::broker::{Broker, BrokerChannel, BrokerConnection};
use crate::error::QueueError;
use crate::job::{Clock, DEFAULT_JOB_TYPE, JobRecord, SystemClock};
use crate::metrics::QueueMetrics;
use crate::queue::QueueSpec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResult {
    /// Always `queued`
    #[schema(example = "queued")]
    pub status: String,
    /// The job id that was published
    #[schema(example = "Job_1700000000_scaling_test")]
    pub message: String,
    /// Queue the job was published to
    #[schema(example = "work_queue")]
    pub queue: String,
}

impl SubmissionResult {
    fn queued(record: &JobRecord, queue: &str) -> Self {
        Self {
            status: "queued".to_string(),
            message: record.id().to_string(),
            queue: queue.to_string(),
        }
    }
}

/// Publishes jobs to the durable work queue.
///
/// Every call opens its own connection and releases it before returning, so
/// concurrent requests never share a connection. There is no retry: a failed
/// submission is reported to the caller as `QueueUnavailable`.
#[derive(Clone)]
pub struct JobProducer {
    broker: Arc<dyn Broker>,
    queue: QueueSpec,
    clock: Arc<dyn Clock>,
    metrics: QueueMetrics,
}

impl JobProducer {
    pub fn new(broker: Arc<dyn Broker>, queue: QueueSpec) -> Self {
        let metrics = QueueMetrics::new(&queue.name);
        Self {
            broker,
            queue,
            clock: Arc::new(SystemClock),
            metrics,
        }
    }

    /// Replace the clock used for job ids.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue.name
    }

    /// Queue one job of `job_type` (default `scaling_test`).
    ///
    /// Declares the queue, publishes the record with the persistent flag and
    /// releases the connection on every path.
    pub async fn submit(&self, job_type: Option<&str>) -> Result<SubmissionResult, QueueError> {
        let record = JobRecord::new(
            job_type.unwrap_or(DEFAULT_JOB_TYPE),
            self.clock.unix_timestamp(),
        );

        match self.publish(&record).await {
            Ok(()) => {
                self.metrics.job_published(true);
                info!(
                    queue = %self.queue.name,
                    job_id = %record.id(),
                    "Queued job"
                );
                Ok(SubmissionResult::queued(&record, &self.queue.name))
            }
            Err(e) => {
                self.metrics.job_published(false);
                warn!(
                    queue = %self.queue.name,
                    job_id = %record.id(),
                    error = %e,
                    "Failed to queue job"
                );
                Err(e.into_unavailable())
            }
        }
    }

    async fn publish(&self, record: &JobRecord) -> Result<(), QueueError> {
        let connection = ScopedConnection::open(self.broker.as_ref()).await?;

        let outcome = async {
            let channel = connection.open_channel().await?;
            channel.declare_queue(&self.queue).await?;
            channel
                .publish(&self.queue.name, &record.encode(), true)
                .await
        }
        .await;

        connection.release().await;
        outcome
    }
}

/// A connection owned by one producer call.
///
/// `release` closes it. If the owning future is dropped first (for example a
/// cancelled HTTP request) the connection is closed from `Drop` on the current
/// runtime instead.
struct ScopedConnection {
    inner: Option<Box<dyn BrokerConnection>>,
}

impl ScopedConnection {
    async fn open(broker: &dyn Broker) -> Result<Self, QueueError> {
        let connection = broker.connect().await?;
        Ok(Self {
            inner: Some(connection),
        })
    }

    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, QueueError> {
        match &self.inner {
            Some(connection) => connection.open_channel().await,
            None => Err(QueueError::broker("open channel", "connection already released")),
        }
    }

    async fn release(mut self) {
        if let Some(connection) = self.inner.take() {
            if let Err(e) = connection.close().await {
                debug!(error = %e, "Error closing producer connection");
            }
        }
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        let Some(connection) = self.inner.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = connection.close().await {
                        debug!(error = %e, "Error closing abandoned producer connection");
                    }
                });
            }
            Err(_) => warn!("Producer connection dropped outside a runtime; left to the broker"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::InMemoryBroker;
    use crate::job::FixedClock;

    fn producer(broker: &InMemoryBroker) -> JobProducer {
        JobProducer::new(Arc::new(broker.clone()), QueueSpec::durable("work_queue"))
            .with_clock(FixedClock(1_700_000_000))
    }

    #[tokio::test]
    async fn test_submit_default_job_type() {
        let broker = InMemoryBroker::new();
        let result = producer(&broker).submit(None).await.unwrap();

        assert_eq!(
            result,
            SubmissionResult {
                status: "queued".into(),
                message: "Job_1700000000_scaling_test".into(),
                queue: "work_queue".into(),
            }
        );
        assert_eq!(broker.queue_depth("work_queue"), Some(1));
        assert_eq!(broker.queue_durable("work_queue"), Some(true));
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_submit_custom_job_type() {
        let broker = InMemoryBroker::new();
        let result = producer(&broker).submit(Some("resize")).await.unwrap();
        assert_eq!(result.message, "Job_1700000000_resize");
    }

    #[tokio::test]
    async fn test_scoped_connection_closed_on_drop() {
        let broker = InMemoryBroker::new();
        let Ok(scoped) = ScopedConnection::open(&broker).await else {
            panic!("in-memory connect failed");
        };
        assert_eq!(broker.open_connections(), 1);

        drop(scoped);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_released_connection_cannot_open_channels() {
        let broker = InMemoryBroker::new();
        let Ok(mut scoped) = ScopedConnection::open(&broker).await else {
            panic!("in-memory connect failed");
        };
        scoped.inner.take().unwrap().close().await.unwrap();
        assert!(scoped.open_channel().await.is_err());
    }
}
