use anyhow::Result;
use async_trait::async_trait;

use crate::models::message::Message;

/// Append-only message history keyed by thread id.
///
/// Histories are returned in insertion order. The system prompt is never stored.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create the conversation if it has never been seen; returns whether it was created
    async fn get_or_create(&self, thread_id: &str) -> Result<bool>;

    /// Full history for a thread, empty when the thread is unknown
    async fn get_history(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Append a batch of messages as one unit: either all of them are stored or none are
    async fn append_all(&self, thread_id: &str, messages: Vec<Message>) -> Result<()>;

    async fn append(&self, thread_id: &str, message: Message) -> Result<()> {
        self.append_all(thread_id, vec![message]).await
    }

    async fn thread_ids(&self) -> Result<Vec<String>>;
}
