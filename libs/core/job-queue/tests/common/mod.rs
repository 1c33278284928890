#![allow(dead_code)]

use async_trait::async_trait;
use job_queue::{
    ConnectionSupervisor, FixedBackoff, FixedClock, HandlerFailurePolicy, InMemoryBroker,
    JobConsumer, JobHandler, JobProducer, JobRecord, QueueError, QueueSpec, SupervisorState,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const QUEUE: &str = "work_queue";

pub fn producer(broker: &InMemoryBroker) -> JobProducer {
    JobProducer::new(Arc::new(broker.clone()), QueueSpec::durable(QUEUE))
        .with_clock(FixedClock(1_700_000_000))
}

/// Handler that records what it saw and can fail (or panic on) its first N attempts.
#[derive(Clone)]
pub struct RecordingHandler {
    inner: Arc<Inner>,
}

struct Inner {
    work: Duration,
    started: Mutex<Vec<(String, Instant)>>,
    completed: Mutex<Vec<String>>,
    failures_left: AtomicU32,
    panics_left: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingHandler {
    pub fn new(work: Duration) -> Self {
        Self::failing(work, 0)
    }

    pub fn failing(work: Duration, failures: u32) -> Self {
        Self::build(work, failures, 0)
    }

    pub fn panicking(work: Duration, panics: u32) -> Self {
        Self::build(work, 0, panics)
    }

    fn build(work: Duration, failures: u32, panics: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                work,
                started: Mutex::new(Vec::new()),
                completed: Mutex::new(Vec::new()),
                failures_left: AtomicU32::new(failures),
                panics_left: AtomicU32::new(panics),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn started(&self) -> Vec<(String, Instant)> {
        self.inner.started.lock().unwrap().clone()
    }

    pub fn started_ids(&self) -> Vec<String> {
        self.started().into_iter().map(|(id, _)| id).collect()
    }

    pub fn completed(&self) -> Vec<String> {
        self.inner.completed.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, job: &JobRecord) -> Result<(), QueueError> {
        let inner = &self.inner;
        inner
            .started
            .lock()
            .unwrap()
            .push((job.id().to_string(), Instant::now()));

        let panic = inner
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if panic {
            panic!("simulated handler panic");
        }

        let now = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(inner.work).await;
        inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = inner
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(QueueError::transient("simulated failure"));
        }

        inner.completed.lock().unwrap().push(job.id().to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RecordingHandler"
    }
}

pub struct RunningWorker {
    pub shutdown: watch::Sender<bool>,
    pub state: watch::Receiver<SupervisorState>,
    pub task: JoinHandle<()>,
}

impl RunningWorker {
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        self.task.await.unwrap();
    }
}

pub fn spawn_worker(
    broker: &InMemoryBroker,
    handler: RecordingHandler,
    policy: HandlerFailurePolicy,
) -> RunningWorker {
    let supervisor = ConnectionSupervisor::new(Arc::new(broker.clone()), QUEUE)
        .with_backoff(FixedBackoff::default());
    let state = supervisor.subscribe();
    let consumer = JobConsumer::new(QueueSpec::durable(QUEUE), handler).with_failure_policy(policy);

    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { supervisor.run(&consumer, shutdown_rx).await });

    RunningWorker {
        shutdown,
        state,
        task,
    }
}

/// Poll `condition` every 50ms of (possibly paused) time until it holds.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}
