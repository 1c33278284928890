use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration for database connections
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    pub max_delay_ms: u64,

    /// Growth factor between retries (1.0 keeps the delay fixed)
    pub backoff_multiplier: f64,

    /// Scale each delay down to 50-100% at random
    pub use_jitter: bool,
}

impl RetryConfig {
    /// Defaults: 3 retries, 100ms doubling up to 5s, with jitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Same delay before every retry, no jitter.
    ///
    /// `RetryConfig::fixed(4, 2000)` gives five attempts two seconds apart.
    pub fn fixed(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            backoff_multiplier: 1.0,
            use_jitter: false,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Un-jittered delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Retry an async operation according to `config`
///
/// # Example
/// ```ignore
/// use database::common::{RetryConfig, retry_with_backoff};
///
/// let db = retry_with_backoff(
///     || database::postgres::connect(&db_url),
///     RetryConfig::fixed(4, 2000),
/// ).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retry > 0 {
                    debug!(retries = retry, "Operation succeeded after retrying");
                }
                return Ok(result);
            }
            Err(e) => {
                retry += 1;
                if retry > config.max_retries {
                    warn!(
                        attempts = config.max_attempts(),
                        error = %e,
                        "Operation failed, giving up"
                    );
                    return Err(e);
                }

                let base = config.delay_for(retry);
                let delay = if config.use_jitter {
                    apply_jitter(base)
                } else {
                    base
                };

                warn!(
                    attempt = retry,
                    max_attempts = config.max_attempts(),
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Scale `delay` to a pseudo-random 50-100% of itself
fn apply_jitter(delay: Duration) -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let factor =
        (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5;
    delay.mul_f64(factor)
}

/// Retry with the default configuration
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryConfig::default()).await
}
