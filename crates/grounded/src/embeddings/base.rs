use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Maps text to fixed-dimension vectors.
///
/// The same embedder must be used at ingestion and query time, otherwise
/// similarity scores are meaningless.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts, returning one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Embedding service returned no vector"))
    }
}
