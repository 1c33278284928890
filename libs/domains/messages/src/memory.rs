//! In-process message store for tests and running the API without PostgreSQL.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::error::{MessageError, MessageResult};
use crate::models::Message;
use crate::repository::MessageRepository;

#[derive(Clone, Default)]
pub struct InMemoryMessageRepository {
    rows: Arc<Mutex<Vec<Message>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.rows.lock().await.clone()
    }

    fn check_available(&self) -> MessageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MessageError::Database(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn ensure_schema(&self) -> MessageResult<()> {
        self.check_available()
    }

    async fn latest(&self) -> MessageResult<Option<Message>> {
        self.check_available()?;
        Ok(self.rows.lock().await.last().cloned())
    }

    async fn create(&self, content: String) -> MessageResult<Message> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;
        let message = Message {
            id: rows.last().map_or(1, |m| m.id + 1),
            content,
            created_at: Some(chrono::Utc::now().naive_utc()),
        };
        rows.push(message.clone());
        Ok(message)
    }

    async fn count(&self) -> MessageResult<u64> {
        self.check_available()?;
        Ok(self.rows.lock().await.len() as u64)
    }

    async fn ping(&self) -> MessageResult<()> {
        self.check_available()
    }
}
