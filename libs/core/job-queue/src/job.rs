//! Job record, delivery envelope and submission clock.

use crate::error::QueueError;
use serde::Serialize;

/// Job type used when the caller does not supply one.
pub const DEFAULT_JOB_TYPE: &str = "scaling_test";

const ID_PREFIX: &str = "Job_";
const UNKNOWN_JOB_TYPE: &str = "unknown";

/// Format a job id as `Job_<unix-timestamp>_<jobType>`.
///
/// Ids have one-second granularity: two jobs of the same type submitted in
/// the same second share an id. Treat it as a display label.
pub fn format_job_id(job_type: &str, unix_ts: i64) -> String {
    format!("{ID_PREFIX}{unix_ts}_{job_type}")
}

/// The unit of work carried by the queue.
///
/// The wire payload is the id string itself. `encode`/`decode` are the only
/// places that know this, so a structured body can replace it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    id: String,
    job_type: String,
}

impl JobRecord {
    pub fn new(job_type: impl Into<String>, submitted_at: i64) -> Self {
        let job_type = job_type.into();
        Self {
            id: format_job_id(&job_type, submitted_at),
            job_type,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Bytes published to the broker.
    pub fn encode(&self) -> Vec<u8> {
        self.id.as_bytes().to_vec()
    }

    /// Rebuild a record from a delivery body.
    ///
    /// Any UTF-8 body is accepted and kept verbatim as the id; bodies that do
    /// not follow the id format get the job type `unknown`. Non UTF-8 bodies
    /// are `InvalidPayload`.
    pub fn decode(body: &[u8]) -> Result<Self, QueueError> {
        let id = std::str::from_utf8(body)
            .map_err(|e| QueueError::InvalidPayload(format!("body is not UTF-8: {e}")))?;

        let job_type = id
            .strip_prefix(ID_PREFIX)
            .and_then(|rest| rest.split_once('_'))
            .filter(|(ts, _)| ts.parse::<i64>().is_ok())
            .map(|(_, job_type)| job_type)
            .unwrap_or(UNKNOWN_JOB_TYPE);

        Ok(Self {
            id: id.to_string(),
            job_type: job_type.to_string(),
        })
    }
}

/// One message handed to a consumer by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Channel-scoped identifier used to ack or nack this delivery.
    pub delivery_tag: u64,
    pub body: Vec<u8>,
    /// Set when the broker has delivered this message before.
    pub redelivered: bool,
}

/// Source of submission timestamps.
pub trait Clock: Send + Sync {
    fn unix_timestamp(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn unix_timestamp(&self) -> i64 {
        self.0
    }
}
