//! Job consumer
//!
//! The consume loop run by the [`ConnectionSupervisor`](crate::ConnectionSupervisor)
//! on every fresh channel: declare, set prefetch, consume, and settle each
//! delivery only after its handler finished.

use crate::broker::BrokerChannel;
use crate::error::{ErrorCategory, QueueError};
use crate::handler::JobHandler;
use crate::job::{Delivery, JobRecord};
use crate::metrics::{JobOutcome, QueueMetrics};
use crate::queue::QueueSpec;
use crate::shutdown::wait_for_shutdown;
use crate::supervisor::Session;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use strum::{Display, EnumString};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Unacknowledged deliveries allowed per consumer.
///
/// One: the broker only sends the next job to a worker that has finished the
/// previous one, so a slow worker never sits on a backlog.
pub const FAIR_DISPATCH_PREFETCH: u16 = 1;

/// What to do with a delivery whose handler failed.
///
/// Permanent errors (undecodable payloads, `QueueError::permanent`) are always
/// rejected without requeue, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HandlerFailurePolicy {
    /// Requeue the first failure, reject once the delivery was already redelivered.
    #[default]
    RequeueOnce,
    /// Always requeue.
    Requeue,
    /// Never requeue.
    Reject,
}

impl HandlerFailurePolicy {
    /// Whether a failed delivery goes back on the queue.
    pub fn should_requeue(&self, error: &QueueError, redelivered: bool) -> bool {
        if error.category() == ErrorCategory::Permanent {
            return false;
        }
        match self {
            HandlerFailurePolicy::RequeueOnce => !redelivered,
            HandlerFailurePolicy::Requeue => true,
            HandlerFailurePolicy::Reject => false,
        }
    }
}

/// Consumes the work queue one job at a time.
pub struct JobConsumer<H> {
    queue: QueueSpec,
    consumer_tag: String,
    handler: H,
    failure_policy: HandlerFailurePolicy,
    metrics: QueueMetrics,
}

impl<H: JobHandler> JobConsumer<H> {
    pub fn new(queue: QueueSpec, handler: H) -> Self {
        let consumer_tag = format!("{}-{}", handler.name(), Uuid::new_v4());
        let metrics = QueueMetrics::new(&queue.name);
        Self {
            queue,
            consumer_tag,
            handler,
            failure_policy: HandlerFailurePolicy::default(),
            metrics,
        }
    }

    pub fn with_failure_policy(mut self, policy: HandlerFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_consumer_tag(mut self, tag: impl Into<String>) -> Self {
        self.consumer_tag = tag.into();
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    async fn process(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let record = JobRecord::decode(&delivery.body)?;
        debug!(
            job_id = %record.id(),
            delivery_tag = delivery.delivery_tag,
            redelivered = delivery.redelivered,
            "Processing job"
        );
        AssertUnwindSafe(self.handler.handle(&record))
            .catch_unwind()
            .await
            .map_err(|payload| panic_to_error(&*payload))
            .and_then(std::convert::identity)
    }

    async fn settle(
        &self,
        channel: &dyn BrokerChannel,
        delivery: &Delivery,
        outcome: Result<(), QueueError>,
        started: Instant,
    ) -> Result<(), QueueError> {
        match outcome {
            Ok(()) => {
                channel.ack(delivery.delivery_tag).await?;
                self.metrics.job_settled(JobOutcome::Success, started.elapsed());
            }
            Err(error) => {
                let requeue = self
                    .failure_policy
                    .should_requeue(&error, delivery.redelivered);
                warn!(
                    handler = self.handler.name(),
                    delivery_tag = delivery.delivery_tag,
                    redelivered = delivery.redelivered,
                    requeue,
                    error = %error,
                    "Job failed"
                );
                channel.nack(delivery.delivery_tag, requeue).await?;

                let outcome = if requeue {
                    JobOutcome::Requeued
                } else {
                    JobOutcome::Rejected
                };
                self.metrics.job_settled(outcome, started.elapsed());
            }
        }
        Ok(())
    }
}

/// A panicking handler is a transient failure, settled by the failure policy.
fn panic_to_error(payload: &(dyn Any + Send)) -> QueueError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    QueueError::transient(format!("handler panicked: {message}"))
}

#[async_trait]
impl<H: JobHandler> Session for JobConsumer<H> {
    async fn run(
        &self,
        channel: &dyn BrokerChannel,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), QueueError> {
        channel.declare_queue(&self.queue).await?;
        channel.set_prefetch(FAIR_DISPATCH_PREFETCH).await?;
        let mut deliveries = channel.consume(&self.queue.name, &self.consumer_tag).await?;

        info!(
            queue = %self.queue.name,
            consumer_tag = %self.consumer_tag,
            "Waiting for messages"
        );

        loop {
            let delivery = tokio::select! {
                _ = wait_for_shutdown(shutdown) => {
                    info!("Shutdown requested, stopping consumer");
                    return Ok(());
                }
                next = deliveries.next() => match next {
                    Some(delivery) => delivery?,
                    None => {
                        return Err(QueueError::BrokerConnectionLost(
                            "consumer cancelled by broker".to_string(),
                        ));
                    }
                },
            };

            let started = Instant::now();
            let outcome = tokio::select! {
                _ = wait_for_shutdown(shutdown) => {
                    // Left unacked: the broker redelivers it once the connection closes.
                    info!(
                        delivery_tag = delivery.delivery_tag,
                        "Shutdown requested, abandoning in-flight job"
                    );
                    return Ok(());
                }
                outcome = self.process(&delivery) => outcome,
            };

            self.settle(channel, &delivery, outcome, started).await?;
        }
    }

    fn name(&self) -> &'static str {
        self.handler.name()
    }
}
