//! Shared application state.

use domain_messages::{MessageRepository, MessageService};
use job_queue::JobProducer;

/// Cloned into every router; both members are cheap `Arc` handles.
pub struct AppState<R: MessageRepository> {
    pub messages: MessageService<R>,
    /// Opens a fresh broker connection per submission
    pub producer: JobProducer,
}

impl<R: MessageRepository> AppState<R> {
    pub fn new(messages: MessageService<R>, producer: JobProducer) -> Self {
        Self { messages, producer }
    }
}

impl<R: MessageRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            producer: self.producer.clone(),
        }
    }
}
