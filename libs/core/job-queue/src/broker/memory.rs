//! In-process broker with AMQP delivery semantics.
//!
//! Behaves like a single RabbitMQ node for the primitives the queue uses:
//! - durable declare is create-if-absent and refuses a durability mismatch
//! - deliveries are pushed round-robin to consumers that have prefetch room
//! - closing a channel or connection requeues its unacknowledged deliveries
//!   at the head of the queue, flagged as redelivered
//! - [`InMemoryBroker::restart`] keeps only durable queues and persistent
//!   messages
//!
//! Fault injection ([`set_reachable`](InMemoryBroker::set_reachable),
//! [`disconnect_all`](InMemoryBroker::disconnect_all),
//! [`fail_publishes`](InMemoryBroker::fail_publishes),
//! [`stall_closes`](InMemoryBroker::stall_closes)) and inspection helpers
//! make it the broker of choice for tests.

use super::{Broker, BrokerChannel, BrokerConnection, DeliveryStream};
use crate::error::QueueError;
use crate::job::Delivery;
use crate::queue::QueueSpec;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

type DeliverySender = mpsc::UnboundedSender<Result<Delivery, QueueError>>;

/// Cheap to clone; clones share the same broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    unreachable: bool,
    fail_publishes: bool,
    stall_closes: bool,
    connect_attempts: u64,
    next_id: u64,
    next_delivery_tag: u64,
    queues: HashMap<String, MemQueue>,
    /// Open connections and the channels opened on each.
    connections: HashMap<u64, Vec<u64>>,
    channels: HashMap<u64, ChannelState>,
    peak_unacked_per_channel: usize,
    rejected: Vec<Vec<u8>>,
}

struct MemQueue {
    durable: bool,
    ready: VecDeque<Message>,
    consumers: Vec<ConsumerSlot>,
    cursor: usize,
}

#[derive(Clone)]
struct Message {
    body: Vec<u8>,
    persistent: bool,
    redelivered: bool,
}

#[derive(Default)]
struct ChannelState {
    /// 0 means unlimited, as in AMQP.
    prefetch: u16,
    /// delivery tag -> (queue name, message)
    unacked: BTreeMap<u64, (String, Message)>,
}

impl ChannelState {
    fn has_capacity(&self) -> bool {
        self.prefetch == 0 || self.unacked.len() < usize::from(self.prefetch)
    }
}

struct ConsumerSlot {
    channel_id: u64,
    tx: DeliverySender,
}

fn channel_closed(channel_id: u64) -> QueueError {
    QueueError::BrokerConnectionLost(format!("channel {channel_id} is closed"))
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn channel_mut(&mut self, channel_id: u64) -> Result<&mut ChannelState, QueueError> {
        self.channels
            .get_mut(&channel_id)
            .ok_or_else(|| channel_closed(channel_id))
    }

    /// Push ready messages to consumers with prefetch room, round-robin.
    fn dispatch(&mut self, queue_name: &str) {
        let State {
            queues,
            channels,
            next_delivery_tag,
            peak_unacked_per_channel,
            ..
        } = self;
        let Some(queue) = queues.get_mut(queue_name) else {
            return;
        };
        queue.consumers.retain(|c| !c.tx.is_closed());

        while !queue.ready.is_empty() && !queue.consumers.is_empty() {
            let n = queue.consumers.len();
            let free = (0..n).map(|k| (queue.cursor + k) % n).find(|&i| {
                channels
                    .get(&queue.consumers[i].channel_id)
                    .is_some_and(ChannelState::has_capacity)
            });
            let Some(i) = free else {
                break;
            };
            let Some(message) = queue.ready.pop_front() else {
                break;
            };

            *next_delivery_tag += 1;
            let delivery = Delivery {
                delivery_tag: *next_delivery_tag,
                body: message.body.clone(),
                redelivered: message.redelivered,
            };
            let channel_id = queue.consumers[i].channel_id;

            if queue.consumers[i].tx.send(Ok(delivery)).is_err() {
                queue.ready.push_front(message);
                queue.consumers.remove(i);
                continue;
            }
            queue.cursor = i + 1;

            if let Some(channel) = channels.get_mut(&channel_id) {
                channel
                    .unacked
                    .insert(*next_delivery_tag, (queue_name.to_string(), message));
                *peak_unacked_per_channel = (*peak_unacked_per_channel).max(channel.unacked.len());
            }
        }
    }

    /// Close a channel: cancel its consumers and requeue what it held.
    fn close_channel(&mut self, channel_id: u64) {
        let Some(channel) = self.channels.remove(&channel_id) else {
            return;
        };

        let mut touched: Vec<String> = Vec::new();
        for queue in self.queues.values_mut() {
            queue.consumers.retain(|c| c.channel_id != channel_id);
        }
        // Highest tag first so the oldest delivery ends up at the head.
        for (_, (queue_name, mut message)) in channel.unacked.into_iter().rev() {
            if let Some(queue) = self.queues.get_mut(&queue_name) {
                message.redelivered = true;
                queue.ready.push_front(message);
            }
            if !touched.contains(&queue_name) {
                touched.push(queue_name);
            }
        }
        for queue_name in touched {
            self.dispatch(&queue_name);
        }
    }

    fn close_connection(&mut self, connection_id: u64) {
        if let Some(channel_ids) = self.connections.remove(&connection_id) {
            for channel_id in channel_ids {
                self.close_channel(channel_id);
            }
        }
    }

    fn close_all_connections(&mut self) {
        let ids: Vec<u64> = self.connections.keys().copied().collect();
        for id in ids {
            self.close_connection(id);
        }
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the broker refuse (`false`) or accept (`true`) new connections.
    /// Going unreachable also drops every open connection.
    pub fn set_reachable(&self, reachable: bool) {
        let mut state = self.lock();
        state.unreachable = !reachable;
        if !reachable {
            state.close_all_connections();
        }
    }

    /// Drop every open connection, as a network partition would.
    pub fn disconnect_all(&self) {
        self.lock().close_all_connections();
    }

    /// Simulate a broker restart: connections drop, transient queues and
    /// non-persistent messages are lost.
    pub fn restart(&self) {
        let mut state = self.lock();
        state.close_all_connections();
        state.queues.retain(|_, queue| queue.durable);
        for queue in state.queues.values_mut() {
            queue.ready.retain(|message| message.persistent);
        }
    }

    /// Make every publish fail until switched off again.
    pub fn fail_publishes(&self, fail: bool) {
        self.lock().fail_publishes = fail;
    }

    /// Make connection close hang forever, like a half-open TCP socket.
    pub fn stall_closes(&self, stall: bool) {
        self.lock().stall_closes = stall;
    }

    /// Messages waiting for a consumer. `None` if the queue does not exist.
    pub fn queue_depth(&self, queue: &str) -> Option<usize> {
        self.lock().queues.get(queue).map(|q| q.ready.len())
    }

    /// Durability the queue was declared with.
    pub fn queue_durable(&self, queue: &str) -> Option<bool> {
        self.lock().queues.get(queue).map(|q| q.durable)
    }

    /// Deliveries from `queue` handed out and not yet settled.
    pub fn unacked_count(&self, queue: &str) -> usize {
        self.lock()
            .channels
            .values()
            .flat_map(|c| c.unacked.values())
            .filter(|(name, _)| name == queue)
            .count()
    }

    /// Highest number of unacknowledged deliveries any single channel has held.
    pub fn peak_unacked_per_channel(&self) -> usize {
        self.lock().peak_unacked_per_channel
    }

    pub fn consumer_count(&self, queue: &str) -> usize {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.consumers.iter().filter(|c| !c.tx.is_closed()).count())
            .unwrap_or(0)
    }

    pub fn open_connections(&self) -> usize {
        self.lock().connections.len()
    }

    /// Every connect call so far, refused ones included.
    pub fn connect_attempts(&self) -> u64 {
        self.lock().connect_attempts
    }

    /// Bodies nacked without requeue.
    pub fn rejected_messages(&self) -> Vec<Vec<u8>> {
        self.lock().rejected.clone()
    }

    fn channel_open(&self, channel_id: u64) -> bool {
        self.lock().channels.contains_key(&channel_id)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, QueueError> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.unreachable {
            return Err(QueueError::broker("connect", "connection refused"));
        }

        let id = state.next_id();
        state.connections.insert(id, Vec::new());
        debug!(connection_id = id, "In-memory connection opened");

        Ok(Box::new(MemoryConnection {
            broker: self.clone(),
            id,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryConnection {
    broker: InMemoryBroker,
    id: u64,
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, QueueError> {
        let mut state = self.broker.lock();
        if !state.connections.contains_key(&self.id) {
            return Err(QueueError::broker("open channel", "connection is closed"));
        }

        let channel_id = state.next_id();
        state.channels.insert(channel_id, ChannelState::default());
        if let Some(channels) = state.connections.get_mut(&self.id) {
            channels.push(channel_id);
        }

        Ok(Box::new(MemoryChannel {
            broker: self.broker.clone(),
            id: channel_id,
        }))
    }

    async fn close(&self) -> Result<(), QueueError> {
        let stalled = {
            let mut state = self.broker.lock();
            if !state.stall_closes {
                state.close_connection(self.id);
            }
            state.stall_closes
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

struct MemoryChannel {
    broker: InMemoryBroker,
    id: u64,
}

#[async_trait]
impl BrokerChannel for MemoryChannel {
    async fn declare_queue(&self, queue: &QueueSpec) -> Result<(), QueueError> {
        let mut state = self.broker.lock();
        state.channel_mut(self.id)?;

        match state.queues.get(&queue.name) {
            Some(existing) if existing.durable != queue.durable => {
                // The broker closes the channel on PRECONDITION_FAILED.
                state.close_channel(self.id);
                Err(QueueError::broker(
                    "declare queue",
                    format!(
                        "PRECONDITION_FAILED - inequivalent arg 'durable' for queue '{}'",
                        queue.name
                    ),
                ))
            }
            Some(_) => Ok(()),
            None => {
                state.queues.insert(
                    queue.name.clone(),
                    MemQueue {
                        durable: queue.durable,
                        ready: VecDeque::new(),
                        consumers: Vec::new(),
                        cursor: 0,
                    },
                );
                Ok(())
            }
        }
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), QueueError> {
        let mut state = self.broker.lock();
        state.channel_mut(self.id)?.prefetch = count;
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8], persistent: bool) -> Result<(), QueueError> {
        let mut state = self.broker.lock();
        state.channel_mut(self.id)?;
        if state.fail_publishes {
            return Err(QueueError::broker("publish", "publish rejected by broker"));
        }

        match state.queues.get_mut(queue) {
            Some(q) => q.ready.push_back(Message {
                body: payload.to_vec(),
                persistent,
                redelivered: false,
            }),
            // Default exchange drops unroutable messages.
            None => {
                debug!(queue, "Dropping unroutable message");
                return Ok(());
            }
        }
        state.dispatch(queue);
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        _consumer_tag: &str,
    ) -> Result<Box<dyn DeliveryStream>, QueueError> {
        let mut state = self.broker.lock();
        state.channel_mut(self.id)?;

        let (tx, rx) = mpsc::unbounded_channel();
        match state.queues.get_mut(queue) {
            Some(q) => q.consumers.push(ConsumerSlot {
                channel_id: self.id,
                tx,
            }),
            None => {
                state.close_channel(self.id);
                return Err(QueueError::broker(
                    "basic.consume",
                    format!("NOT_FOUND - no queue '{queue}'"),
                ));
            }
        }
        state.dispatch(queue);

        Ok(Box::new(MemoryDeliveries {
            broker: self.broker.clone(),
            channel_id: self.id,
            rx,
        }))
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), QueueError> {
        let mut state = self.broker.lock();
        let settled = state.channel_mut(self.id)?.unacked.remove(&delivery_tag);
        let Some((queue_name, _)) = settled else {
            state.close_channel(self.id);
            return Err(QueueError::broker(
                "basic.ack",
                format!("PRECONDITION_FAILED - unknown delivery tag {delivery_tag}"),
            ));
        };
        state.dispatch(&queue_name);
        Ok(())
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), QueueError> {
        let mut state = self.broker.lock();
        let settled = state.channel_mut(self.id)?.unacked.remove(&delivery_tag);
        let Some((queue_name, mut message)) = settled else {
            state.close_channel(self.id);
            return Err(QueueError::broker(
                "basic.nack",
                format!("PRECONDITION_FAILED - unknown delivery tag {delivery_tag}"),
            ));
        };

        if requeue {
            if let Some(queue) = state.queues.get_mut(&queue_name) {
                message.redelivered = true;
                queue.ready.push_front(message);
            }
        } else {
            state.rejected.push(message.body);
        }
        state.dispatch(&queue_name);
        Ok(())
    }
}

struct MemoryDeliveries {
    broker: InMemoryBroker,
    channel_id: u64,
    rx: mpsc::UnboundedReceiver<Result<Delivery, QueueError>>,
}

#[async_trait]
impl DeliveryStream for MemoryDeliveries {
    async fn next(&mut self) -> Option<Result<Delivery, QueueError>> {
        let delivery = self.rx.recv().await?;
        // Anything still buffered after the channel closed was already requeued.
        if !self.broker.channel_open(self.channel_id) {
            return None;
        }
        Some(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUE: &str = "work_queue";

    async fn channel(broker: &InMemoryBroker) -> (Box<dyn BrokerConnection>, Box<dyn BrokerChannel>) {
        let connection = broker.connect().await.unwrap();
        let channel = connection.open_channel().await.unwrap();
        (connection, channel)
    }

    #[tokio::test]
    async fn test_declare_mismatched_durability_is_refused() {
        let broker = InMemoryBroker::new();
        let (_conn, ch) = channel(&broker).await;
        ch.declare_queue(&QueueSpec::durable(QUEUE)).await.unwrap();

        let (_conn2, ch2) = channel(&broker).await;
        let err = ch2.declare_queue(&QueueSpec::transient(QUEUE)).await.unwrap_err();
        assert!(err.to_string().contains("PRECONDITION_FAILED"));
        assert_eq!(broker.queue_durable(QUEUE), Some(true));

        // The failed declare closed that channel.
        assert!(ch2.set_prefetch(1).await.is_err());
    }

    #[tokio::test]
    async fn test_prefetch_limits_deliveries_until_ack() {
        let broker = InMemoryBroker::new();
        let (_conn, ch) = channel(&broker).await;
        ch.declare_queue(&QueueSpec::durable(QUEUE)).await.unwrap();
        for body in [b"a", b"b", b"c"] {
            ch.publish(QUEUE, body, true).await.unwrap();
        }

        ch.set_prefetch(1).await.unwrap();
        let mut deliveries = ch.consume(QUEUE, "c1").await.unwrap();

        let first = deliveries.next().await.unwrap().unwrap();
        assert_eq!(first.body, b"a");
        assert_eq!(broker.unacked_count(QUEUE), 1);
        assert_eq!(broker.queue_depth(QUEUE), Some(2));

        ch.ack(first.delivery_tag).await.unwrap();
        let second = deliveries.next().await.unwrap().unwrap();
        assert_eq!(second.body, b"b");
        assert_eq!(broker.peak_unacked_per_channel(), 1);
    }

    #[tokio::test]
    async fn test_closing_connection_requeues_unacked_as_redelivered() {
        let broker = InMemoryBroker::new();
        let (conn, ch) = channel(&broker).await;
        ch.declare_queue(&QueueSpec::durable(QUEUE)).await.unwrap();
        ch.publish(QUEUE, b"job", true).await.unwrap();

        let mut deliveries = ch.consume(QUEUE, "c1").await.unwrap();
        let delivery = deliveries.next().await.unwrap().unwrap();
        assert!(!delivery.redelivered);

        conn.close().await.unwrap();
        assert_eq!(broker.queue_depth(QUEUE), Some(1));
        assert_eq!(broker.open_connections(), 0);
        assert!(deliveries.next().await.is_none());
        assert!(ch.ack(delivery.delivery_tag).await.is_err());

        let (_conn, ch) = channel(&broker).await;
        let mut deliveries = ch.consume(QUEUE, "c2").await.unwrap();
        let again = deliveries.next().await.unwrap().unwrap();
        assert_eq!(again.body, b"job");
        assert!(again.redelivered);
    }

    #[tokio::test]
    async fn test_nack_without_requeue_drops_message() {
        let broker = InMemoryBroker::new();
        let (_conn, ch) = channel(&broker).await;
        ch.declare_queue(&QueueSpec::durable(QUEUE)).await.unwrap();
        ch.publish(QUEUE, b"poison", true).await.unwrap();

        let mut deliveries = ch.consume(QUEUE, "c1").await.unwrap();
        let delivery = deliveries.next().await.unwrap().unwrap();
        ch.nack(delivery.delivery_tag, false).await.unwrap();

        assert_eq!(broker.queue_depth(QUEUE), Some(0));
        assert_eq!(broker.unacked_count(QUEUE), 0);
        assert_eq!(broker.rejected_messages(), vec![b"poison".to_vec()]);
    }

    #[tokio::test]
    async fn test_unreachable_broker_refuses_and_drops_connections() {
        let broker = InMemoryBroker::new();
        let (_conn, ch) = channel(&broker).await;

        broker.set_reachable(false);
        assert_eq!(broker.open_connections(), 0);
        assert!(ch.declare_queue(&QueueSpec::durable(QUEUE)).await.is_err());
        assert!(broker.connect().await.is_err());
        assert_eq!(broker.connect_attempts(), 2);

        broker.set_reachable(true);
        assert!(broker.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_to_missing_queue_is_dropped() {
        let broker = InMemoryBroker::new();
        let (_conn, ch) = channel(&broker).await;
        ch.publish("nowhere", b"x", true).await.unwrap();
        assert_eq!(broker.queue_depth("nowhere"), None);
    }
}
