//! Prometheus metrics for the job queue
//!
//! Recorded through the `metrics` facade; the exporter is installed by the
//! binary (`observability::init_metrics`).

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use strum::IntoStaticStr;

/// How a consumed job was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobOutcome {
    /// Handler succeeded, delivery acked
    Success,
    /// Handler failed, delivery nacked back onto the queue
    Requeued,
    /// Handler failed, delivery nacked without requeue
    Rejected,
}

/// Queue metrics helper, labelled by queue name
#[derive(Clone, Debug)]
pub struct QueueMetrics {
    queue: String,
}

impl QueueMetrics {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
        }
    }

    /// Record a producer submission
    pub fn job_published(&self, success: bool) {
        counter!(
            "jobs_published_total",
            "queue" => self.queue.clone(),
            "status" => if success { "success" } else { "error" }
        )
        .increment(1);
    }

    /// Record a settled delivery and the time spent in the handler
    pub fn job_settled(&self, outcome: JobOutcome, duration: Duration) {
        let status: &'static str = outcome.into();
        counter!(
            "jobs_processed_total",
            "queue" => self.queue.clone(),
            "status" => status
        )
        .increment(1);

        histogram!(
            "job_duration_seconds",
            "queue" => self.queue.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a consumer session ending and being retried
    pub fn reconnect(&self) {
        counter!(
            "broker_reconnects_total",
            "queue" => self.queue.clone()
        )
        .increment(1);
    }

    /// Update the connected gauge
    pub fn connected(&self, connected: bool) {
        gauge!(
            "broker_connected",
            "queue" => self.queue.clone()
        )
        .set(if connected { 1.0 } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        let labels: Vec<&'static str> = [JobOutcome::Success, JobOutcome::Requeued, JobOutcome::Rejected]
            .into_iter()
            .map(Into::into)
            .collect();
        assert_eq!(labels, ["success", "requeued", "rejected"]);
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = QueueMetrics::new("work_queue");
        metrics.job_published(true);
        metrics.job_settled(JobOutcome::Success, Duration::from_millis(5));
        metrics.reconnect();
        metrics.connected(false);
    }
}
