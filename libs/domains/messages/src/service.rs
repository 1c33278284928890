use observability::DbMetrics;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::error::MessageResult;
use crate::models::{DatabaseStatus, Message, SEED_MESSAGE};
use crate::repository::MessageRepository;

/// Service layer for messages: seeding and per-query metrics
pub struct MessageService<R: MessageRepository> {
    repository: Arc<R>,
}

impl<R: MessageRepository> Clone for MessageService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: MessageRepository> MessageService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create the table and seed it when empty.
    ///
    /// Counted once as `db_query_total{operation="init"}`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> MessageResult<()> {
        let result: MessageResult<()> = async {
            self.repository.ensure_schema().await?;
            if self.repository.count().await? == 0 {
                self.repository.create(SEED_MESSAGE.to_string()).await?;
                tracing::info!("Seeded messages table");
            }
            Ok(())
        }
        .await;

        DbMetrics::observe("init", result)
    }

    /// Most recent message, if any
    pub async fn latest(&self) -> MessageResult<Option<Message>> {
        DbMetrics::observe("select", self.repository.latest().await)
    }

    #[instrument(skip(self, content))]
    pub async fn create(&self, content: String) -> MessageResult<Message> {
        DbMetrics::observe("insert", self.repository.create(content).await)
    }

    /// Ping the database; failures are reported, never returned
    pub async fn database_status(&self) -> DatabaseStatus {
        match DbMetrics::observe("health_check", self.repository.ping().await) {
            Ok(()) => DatabaseStatus::Connected,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                DatabaseStatus::Disconnected
            }
        }
    }
}
