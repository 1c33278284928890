//! Job handlers.

use crate::error::QueueError;
use crate::job::JobRecord;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Work performed for each delivered job.
///
/// The consumer acknowledges a delivery only after `handle` returns `Ok`.
/// Handlers must tolerate running the same job twice: delivery is
/// at-least-once.
///
/// # Example
///
/// ```rust,ignore
/// use job_queue::{JobHandler, JobRecord, QueueError};
///
/// struct Reindex { search: SearchClient }
///
/// #[async_trait]
/// impl JobHandler for Reindex {
///     async fn handle(&self, job: &JobRecord) -> Result<(), QueueError> {
///         self.search
///             .reindex()
///             .await
///             .map_err(|e| QueueError::transient(e.to_string()))
///     }
///
///     fn name(&self) -> &'static str {
///         "Reindex"
///     }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobRecord) -> Result<(), QueueError>;

    /// Handler name for logging and consumer tags.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<H: JobHandler + ?Sized> JobHandler for Arc<H> {
    async fn handle(&self, job: &JobRecord) -> Result<(), QueueError> {
        (**self).handle(job).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Stand-in workload: sleeps for a fixed duration per job.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    duration: Duration,
}

impl SimulatedWork {
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(2);

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION)
    }
}

#[async_trait]
impl JobHandler for SimulatedWork {
    async fn handle(&self, job: &JobRecord) -> Result<(), QueueError> {
        info!(job_id = %job.id(), job_type = %job.job_type(), "Received job");
        tokio::time::sleep(self.duration).await;
        info!(job_id = %job.id(), "Done");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SimulatedWork"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_work_takes_configured_duration() {
        let handler = SimulatedWork::default();
        let job = JobRecord::new("scaling_test", 1_700_000_000);

        let start = tokio::time::Instant::now();
        handler.handle(&job).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_arc_handler_delegates() {
        let handler = Arc::new(SimulatedWork::new(Duration::ZERO));
        let job = JobRecord::new("noop", 0);
        handler.handle(&job).await.unwrap();
        assert_eq!(JobHandler::name(&handler), "SimulatedWork");
    }
}
