use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use core_config::AppInfo;
use job_queue::{
    HandlerFailurePolicy, HealthState, InMemoryBroker, JobProducer, QueueSpec, SupervisorState,
    health_router,
};
use lab_worker::{Worker, WorkerSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tower::ServiceExt;

const QUEUE: &str = "work_queue";

fn settings() -> WorkerSettings {
    WorkerSettings {
        work_duration: Duration::from_millis(100),
        retry_delay: Duration::from_secs(5),
        failure_policy: HandlerFailurePolicy::RequeueOnce,
        health_port: 0,
    }
}

async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

async fn ready_status(state: HealthState) -> StatusCode {
    health_router(state)
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test(start_paused = true)]
async fn worker_drains_queue_then_stops_cleanly() {
    let broker = InMemoryBroker::new();
    let producer = JobProducer::new(Arc::new(broker.clone()), QueueSpec::durable(QUEUE));
    for _ in 0..3 {
        producer.submit(None).await.unwrap();
    }

    let worker = Arc::new(Worker::new(
        Arc::new(broker.clone()),
        QueueSpec::durable(QUEUE),
        &settings(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.run(shutdown_rx).await }
    });

    let drained = wait_until(Duration::from_secs(10), || {
        broker.queue_depth(QUEUE) == Some(0) && broker.unacked_count(QUEUE) == 0
    })
    .await;
    assert!(drained);
    assert_eq!(broker.peak_unacked_per_channel(), 1);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();

    assert_eq!(*worker.subscribe().borrow(), SupervisorState::Disconnected);
    assert_eq!(broker.open_connections(), 0);
}

#[tokio::test(start_paused = true)]
async fn readiness_follows_broker_session() {
    let broker = InMemoryBroker::new();
    broker.set_reachable(false);

    let worker = Arc::new(Worker::new(
        Arc::new(broker.clone()),
        QueueSpec::durable(QUEUE),
        &settings(),
    ));
    let health = HealthState::new(
        AppInfo {
            name: "lab_worker",
            version: "0.1.0",
        },
        QUEUE,
        worker.subscribe(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.run(shutdown_rx).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ready_status(health.clone()).await, StatusCode::SERVICE_UNAVAILABLE);

    broker.set_reachable(true);
    let mut state = worker.subscribe();
    let running = wait_until(Duration::from_secs(10), || {
        *state.borrow_and_update() == SupervisorState::Running
    })
    .await;
    assert!(running);
    assert_eq!(ready_status(health).await, StatusCode::OK);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
