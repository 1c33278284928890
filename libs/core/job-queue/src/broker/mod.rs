//! Broker abstraction
//!
//! The minimal set of AMQP primitives the producer and consumer need:
//! durable declare, persistent publish, prefetch, consume, ack and nack.
//! Any broker that provides them is interchangeable.
//!
//! Implementations:
//! - [`amqp::AmqpBroker`]: RabbitMQ over AMQP 0-9-1 (lapin)
//! - [`memory::InMemoryBroker`]: in-process broker with the same delivery
//!   guarantees, used by tests

pub mod amqp;
pub mod memory;

use crate::error::QueueError;
use crate::job::Delivery;
use crate::queue::QueueSpec;
use async_trait::async_trait;

/// Opens connections to a broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Establish a new connection. Each caller owns the returned connection
    /// exclusively and must close it.
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, QueueError>;

    /// Broker implementation name for logging
    fn name(&self) -> &'static str;
}

/// One live connection to the broker.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, QueueError>;

    /// Close the connection. Unacknowledged deliveries on its channels go back
    /// to their queues.
    async fn close(&self) -> Result<(), QueueError>;
}

/// A channel on a connection.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Create the queue if absent. Idempotent for matching durability.
    async fn declare_queue(&self, queue: &QueueSpec) -> Result<(), QueueError>;

    /// Limit unacknowledged deliveries on this channel.
    async fn set_prefetch(&self, count: u16) -> Result<(), QueueError>;

    /// Publish to `queue` through the default exchange.
    async fn publish(&self, queue: &str, payload: &[u8], persistent: bool) -> Result<(), QueueError>;

    /// Start a manual-ack consumer on `queue`.
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Box<dyn DeliveryStream>, QueueError>;

    async fn ack(&self, delivery_tag: u64) -> Result<(), QueueError>;

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), QueueError>;
}

/// Deliveries pushed by the broker to one consumer.
#[async_trait]
pub trait DeliveryStream: Send {
    /// Next delivery. `None` once the consumer was cancelled or its channel
    /// closed.
    async fn next(&mut self) -> Option<Result<Delivery, QueueError>>;
}

macro_rules! opaque_debug {
    ($($name:ident),* $(,)?) => {
        $(
            impl std::fmt::Debug for dyn $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(stringify!($name))
                }
            }
        )*
    };
}

opaque_debug!(Broker, BrokerConnection, BrokerChannel, DeliveryStream);
