//! RabbitMQ test infrastructure

use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::rabbitmq::RabbitMq;

/// RabbitMQ container with the default `guest`/`guest` account
///
/// ```ignore
/// use test_utils::TestRabbitMq;
///
/// # async fn example() {
/// let rabbit = TestRabbitMq::new().await;
/// let config = BrokerConfig::new(rabbit.host(), rabbit.port())
///     .with_credentials(TestRabbitMq::USER, TestRabbitMq::PASSWORD);
/// # }
/// ```
pub struct TestRabbitMq {
    container: ContainerAsync<RabbitMq>,
    port: u16,
}

impl TestRabbitMq {
    pub const USER: &'static str = "guest";
    pub const PASSWORD: &'static str = "guest";

    pub async fn new() -> Self {
        let container = RabbitMq::default()
            .start()
            .await
            .expect("Failed to start RabbitMQ container");

        let port = container
            .get_host_port_ipv4(5672)
            .await
            .expect("Failed to get AMQP port");

        tracing::info!(port, "Test RabbitMQ ready");

        Self { container, port }
    }

    pub fn host(&self) -> &'static str {
        "127.0.0.1"
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the broker process, keeping the container (and its data).
    pub async fn stop(&self) {
        self.container
            .stop()
            .await
            .expect("Failed to stop RabbitMQ container");
    }

    /// Start a stopped broker again. The host port may change.
    pub async fn restart(&mut self) {
        self.container
            .start()
            .await
            .expect("Failed to restart RabbitMQ container");
        self.port = self
            .container
            .get_host_port_ipv4(5672)
            .await
            .expect("Failed to get AMQP port");
    }
}
