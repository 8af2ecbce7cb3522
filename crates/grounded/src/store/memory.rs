use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::base::ConversationStore;
use crate::models::message::Message;

/// Conversations kept for the lifetime of the process. Nothing is ever evicted.
#[derive(Default)]
pub struct InMemoryStore {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_or_create(&self, thread_id: &str) -> Result<bool> {
        let mut threads = self.threads.write().await;
        if threads.contains_key(thread_id) {
            return Ok(false);
        }
        threads.insert(thread_id.to_string(), Vec::new());
        Ok(true)
    }

    async fn get_history(&self, thread_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_all(&self, thread_id: &str, messages: Vec<Message>) -> Result<()> {
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn thread_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_once() -> Result<()> {
        let store = InMemoryStore::new();
        assert!(store.get_or_create("t1").await?);
        assert!(!store.get_or_create("t1").await?);
        assert!(store.get_history("t1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_append_preserves_order_and_isolation() -> Result<()> {
        let store = InMemoryStore::new();
        store.append("a", Message::user().with_text("one")).await?;
        store.append("b", Message::user().with_text("other")).await?;
        store.append("a", Message::assistant().with_text("two")).await?;

        let history = store.get_history("a").await?;
        let texts: Vec<_> = history.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(store.get_history("b").await?.len(), 1);
        assert!(store.get_history("missing").await?.is_empty());
        assert_eq!(store.thread_ids().await?, vec!["a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_all_keeps_batch_order() -> Result<()> {
        let store = InMemoryStore::new();
        store.append("a", Message::user().with_text("one")).await?;
        store
            .append_all(
                "a",
                vec![
                    Message::user().with_text("two"),
                    Message::assistant().with_text("three"),
                ],
            )
            .await?;

        let texts: Vec<_> = store
            .get_history("a")
            .await?
            .iter()
            .map(|m| m.text())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        Ok(())
    }
}
