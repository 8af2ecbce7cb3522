use super::{
    base::VectorIndex, configs::IndexConfig, memory::InMemoryIndex, pinecone::PineconeIndex,
};
use anyhow::Result;
use std::sync::Arc;

/// Connect to an existing index for querying
pub async fn connect_index(config: IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config {
        IndexConfig::Pinecone(pinecone_config) => {
            Ok(Arc::new(PineconeIndex::connect(pinecone_config).await?))
        }
        IndexConfig::Memory => Ok(Arc::new(InMemoryIndex::new())),
    }
}

/// Connect for ingestion, creating the index first when the backend supports it
pub async fn ensure_index(config: IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config {
        IndexConfig::Pinecone(pinecone_config) => {
            Ok(Arc::new(PineconeIndex::ensure(pinecone_config).await?))
        }
        IndexConfig::Memory => Ok(Arc::new(InMemoryIndex::new())),
    }
}
