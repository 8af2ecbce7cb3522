use super::{
    base::ConversationStore, configs::StoreConfig, jsonl::JsonlStore, memory::InMemoryStore,
};
use anyhow::Result;
use std::sync::Arc;

pub fn open_store(config: StoreConfig) -> Result<Arc<dyn ConversationStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreConfig::Jsonl { dir } => Ok(Arc::new(JsonlStore::new(dir)?)),
    }
}
