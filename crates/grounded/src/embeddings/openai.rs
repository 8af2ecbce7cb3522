use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::base::Embedder;
use super::configs::OpenAiEmbeddingConfig;
use crate::retry::is_retryable_status;

pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Client for any server implementing `POST /v1/embeddings`
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbeddingConfig,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiEmbeddingConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.config.host.trim_end_matches('/'));
        let payload = json!({
            "model": self.config.model,
            "input": texts,
        });

        let mut request = self.client.post(&url).json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }
        let response = self.config.retry.send(request).await?;

        let mut body: EmbeddingResponse = match response.status() {
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

        if body.data.len() != texts.len() {
            return Err(anyhow!(
                "Embedding server returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            ));
        }
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
