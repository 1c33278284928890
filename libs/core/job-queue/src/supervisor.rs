//! Connection supervisor
//!
//! Owns the consumer's broker connection lifecycle:
//!
//! ```text
//! Disconnected -> Connecting -> Running
//!      ^              |            |
//!      +---- backoff -+------------+  (any failure)
//! ```
//!
//! The loop has no terminal state of its own. Only the shutdown signal ends
//! it, from any state, and that is a clean `return`, not an error.

use crate::broker::{Broker, BrokerChannel};
use crate::error::QueueError;
use crate::metrics::QueueMetrics;
use crate::shutdown::wait_for_shutdown;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where the supervisor currently is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    Running,
}

/// Delay before reconnect attempt `attempt` (1 for the first retry).
pub trait BackoffStrategy: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay before every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff(pub Duration);

impl FixedBackoff {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self(Self::DEFAULT_DELAY)
    }
}

impl BackoffStrategy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Doubling delay capped at `max`, optionally jittered down to 50-100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub jitter: bool,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max);

        if self.jitter {
            delay.mul_f64(jitter_factor())
        } else {
            delay
        }
    }
}

/// Pseudo-random factor in [0.5, 1.0). Mirrors `database`'s retry jitter.
fn jitter_factor() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5
}

/// Work run on a live channel, such as a consume loop.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run until shutdown (return `Ok`) or until the channel fails (return
    /// `Err`, and the supervisor reconnects).
    async fn run(
        &self,
        channel: &dyn BrokerChannel,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), QueueError>;

    /// Session name for logging
    fn name(&self) -> &'static str;
}

enum Attempt {
    Shutdown,
    Failed { error: QueueError, was_running: bool },
}

/// Keeps a [`Session`] running against the broker for the life of the process.
pub struct ConnectionSupervisor {
    broker: Arc<dyn Broker>,
    backoff: Box<dyn BackoffStrategy>,
    state: watch::Sender<SupervisorState>,
    metrics: QueueMetrics,
}

impl ConnectionSupervisor {
    /// Upper bound on closing a connection; a half-open socket would
    /// otherwise hold the close until the heartbeat expires.
    pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Supervisor with the default fixed 5s backoff.
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SupervisorState::Disconnected);
        Self {
            broker,
            backoff: Box::new(FixedBackoff::default()),
            state,
            metrics: QueueMetrics::new(queue),
        }
    }

    pub fn with_backoff(mut self, backoff: impl BackoffStrategy + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Subscribe to state changes (health endpoints, tests).
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    fn set_state(&self, next: SupervisorState) {
        self.state.send_replace(next);
        self.metrics.connected(next == SupervisorState::Running);
    }

    /// Run `session` until shutdown is requested.
    ///
    /// Connection failures and session errors are logged and retried after
    /// the backoff delay. The retry counter resets whenever a session reaches
    /// `Running`.
    pub async fn run<S: Session>(&self, session: &S, mut shutdown: watch::Receiver<bool>) {
        info!(
            broker = self.broker.name(),
            session = session.name(),
            "Starting connection supervisor"
        );

        let mut attempt: u32 = 0;
        loop {
            match self.run_once(session, &mut shutdown).await {
                Attempt::Shutdown => break,
                Attempt::Failed { error, was_running } => {
                    if was_running {
                        attempt = 0;
                    }
                    attempt = attempt.saturating_add(1);
                    self.set_state(SupervisorState::Disconnected);
                    self.metrics.reconnect();

                    let delay = self.backoff.delay(attempt);
                    error!(
                        error = %error,
                        attempt,
                        retry_in_secs = delay.as_secs_f64(),
                        "Broker session failed, retrying in {:.1} seconds",
                        delay.as_secs_f64()
                    );

                    tokio::select! {
                        _ = wait_for_shutdown(&mut shutdown) => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.set_state(SupervisorState::Disconnected);
        info!(session = session.name(), "Connection supervisor stopped");
    }

    async fn run_once<S: Session>(
        &self,
        session: &S,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Attempt {
        if *shutdown.borrow() {
            return Attempt::Shutdown;
        }

        self.set_state(SupervisorState::Connecting);
        let connection = tokio::select! {
            _ = wait_for_shutdown(shutdown) => return Attempt::Shutdown,
            result = self.broker.connect() => match result {
                Ok(connection) => connection,
                Err(error) => return Attempt::Failed { error, was_running: false },
            },
        };

        let mut was_running = false;
        let outcome = async {
            let channel = connection.open_channel().await?;
            self.set_state(SupervisorState::Running);
            was_running = true;
            info!(session = session.name(), "Connected to broker");
            session.run(channel.as_ref(), shutdown).await
        }
        .await;

        match tokio::time::timeout(Self::CLOSE_TIMEOUT, connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Error closing broker connection"),
            Err(_) => warn!(
                timeout_secs = Self::CLOSE_TIMEOUT.as_secs(),
                "Timed out closing broker connection, dropping it"
            ),
        }

        match outcome {
            Ok(()) => Attempt::Shutdown,
            Err(error) => {
                warn!(session = session.name(), error = %error, "Broker session ended");
                Attempt::Failed { error, was_running }
            }
        }
    }
}
