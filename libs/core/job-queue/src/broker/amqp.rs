//! RabbitMQ implementation of the broker traits.

use super::{Broker, BrokerChannel, BrokerConnection, DeliveryStream};
use crate::config::BrokerConfig;
use crate::error::QueueError;
use crate::job::Delivery;
use crate::queue::QueueSpec;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        BasicQosOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use std::time::Duration;
use tracing::debug;

/// AMQP delivery mode that makes the broker write the message to disk.
const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// Reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// Connects to RabbitMQ with lapin.
///
/// Every `connect` call opens a fresh TCP connection; nothing is pooled.
pub struct AmqpBroker {
    uri: String,
    addr: String,
    connect_timeout: Duration,
}

impl AmqpBroker {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            uri: config.amqp_uri(),
            addr: config.display_addr(),
            connect_timeout: config.connect_timeout,
        }
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, QueueError> {
        debug!(addr = %self.addr, "Connecting to AMQP broker");

        let connect = Connection::connect(&self.uri, ConnectionProperties::default());
        let connection = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                QueueError::BrokerConnectionLost(format!(
                    "connect to {} timed out after {}s",
                    self.addr,
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| QueueError::broker("connect", e))?;

        Ok(Box::new(AmqpConnection { inner: connection }))
    }

    fn name(&self) -> &'static str {
        "amqp"
    }
}

struct AmqpConnection {
    inner: Connection,
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, QueueError> {
        let channel = self
            .inner
            .create_channel()
            .await
            .map_err(|e| QueueError::broker("open channel", e))?;

        Ok(Box::new(AmqpChannel { inner: channel }))
    }

    async fn close(&self) -> Result<(), QueueError> {
        if !self.inner.status().connected() {
            return Ok(());
        }
        self.inner
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|e| QueueError::broker("close connection", e))
    }
}

struct AmqpChannel {
    inner: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn declare_queue(&self, queue: &QueueSpec) -> Result<(), QueueError> {
        self.inner
            .queue_declare(
                &queue.name,
                QueueDeclareOptions {
                    durable: queue.durable,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::broker("declare queue", e))?;
        Ok(())
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), QueueError> {
        self.inner
            .basic_qos(count, BasicQosOptions::default())
            .await
            .map_err(|e| QueueError::broker("basic.qos", e))
    }

    async fn publish(&self, queue: &str, payload: &[u8], persistent: bool) -> Result<(), QueueError> {
        let properties = if persistent {
            BasicProperties::default().with_delivery_mode(PERSISTENT_DELIVERY_MODE)
        } else {
            BasicProperties::default()
        };

        self.inner
            .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
            .await
            .map_err(|e| QueueError::broker("publish", e))?
            .await
            .map_err(|e| QueueError::broker("publish confirm", e))?;
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Box<dyn DeliveryStream>, QueueError> {
        let consumer = self
            .inner
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::broker("basic.consume", e))?;

        Ok(Box::new(AmqpDeliveries { inner: consumer }))
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), QueueError> {
        self.inner
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::broker("basic.ack", e))
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), QueueError> {
        self.inner
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue,
                },
            )
            .await
            .map_err(|e| QueueError::broker("basic.nack", e))
    }
}

struct AmqpDeliveries {
    inner: Consumer,
}

#[async_trait]
impl DeliveryStream for AmqpDeliveries {
    async fn next(&mut self) -> Option<Result<Delivery, QueueError>> {
        let delivery = self.inner.next().await?;
        Some(
            delivery
                .map(|d| Delivery {
                    delivery_tag: d.delivery_tag,
                    body: d.data,
                    redelivered: d.redelivered,
                })
                .map_err(|e| QueueError::broker("consume", e)),
        )
    }
}
