use async_trait::async_trait;

use crate::error::MessageResult;
use crate::models::Message;

/// Repository trait for Message persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Create the messages table if it does not exist
    async fn ensure_schema(&self) -> MessageResult<()>;

    /// Most recently inserted message (highest id)
    async fn latest(&self) -> MessageResult<Option<Message>>;

    /// Insert a message, returning the stored row
    async fn create(&self, content: String) -> MessageResult<Message>;

    /// Count all messages
    async fn count(&self) -> MessageResult<u64>;

    /// Round-trip to the store without touching the table
    async fn ping(&self) -> MessageResult<()>;
}
