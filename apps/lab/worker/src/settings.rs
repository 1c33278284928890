use core_config::{ConfigError, FromEnv, env_parse};
use job_queue::HandlerFailurePolicy;
use std::time::Duration;

/// Worker tuning read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// How long `SimulatedWork` sleeps per job
    pub work_duration: Duration,
    /// Delay between broker reconnect attempts
    pub retry_delay: Duration,
    pub failure_policy: HandlerFailurePolicy,
    /// Port for `/health`, `/ready` and `/metrics`
    pub health_port: u16,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            work_duration: Duration::from_millis(2_000),
            retry_delay: Duration::from_secs(5),
            failure_policy: HandlerFailurePolicy::RequeueOnce,
            health_port: 8082,
        }
    }
}

impl FromEnv for WorkerSettings {
    /// Reads `JOB_WORK_DURATION_MS`, `JOB_RETRY_DELAY_SECS`,
    /// `JOB_FAILURE_POLICY` (`requeue_once`, `requeue`, `reject`) and
    /// `HEALTH_PORT`.
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let retry_delay_secs: u64 = env_parse("JOB_RETRY_DELAY_SECS", 5)?;
        if retry_delay_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JOB_RETRY_DELAY_SECS".to_string(),
                details: "must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            work_duration: Duration::from_millis(env_parse("JOB_WORK_DURATION_MS", 2_000)?),
            retry_delay: Duration::from_secs(retry_delay_secs),
            failure_policy: env_parse("JOB_FAILURE_POLICY", defaults.failure_policy)?,
            health_port: env_parse("HEALTH_PORT", defaults.health_port)?,
        })
    }
}
