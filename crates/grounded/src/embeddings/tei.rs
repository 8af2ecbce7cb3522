use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

use super::base::Embedder;
use super::configs::TeiEmbeddingConfig;
use crate::retry::is_retryable_status;

pub const TEI_HOST: &str = "http://localhost:8080";
pub const TEI_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Client for a text-embeddings-inference server (`POST /embed`)
pub struct TeiEmbedder {
    client: Client,
    config: TeiEmbeddingConfig,
}

impl TeiEmbedder {
    pub fn new(config: TeiEmbeddingConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for TeiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embed", self.config.host.trim_end_matches('/'));
        let payload = json!({ "inputs": texts, "truncate": true });

        tracing::debug!(model = %self.config.model, count = texts.len(), "embedding texts");
        let response = self
            .config
            .retry
            .send(self.client.post(&url).json(&payload))
            .await?;

        let vectors: Vec<Vec<f32>> = match response.status() {
            StatusCode::OK => response.json().await?,
            status if is_retryable_status(status) => {
                return Err(anyhow!("Embedding server error: {}", status))
            }
            status => {
                return Err(anyhow!(
                    "Embedding request failed: {}\nBody: {}",
                    status,
                    response.text().await.unwrap_or_default()
                ))
            }
        };

        if vectors.len() != texts.len() {
            return Err(anyhow!(
                "Embedding server returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            ));
        }
        Ok(vectors)
    }
}
