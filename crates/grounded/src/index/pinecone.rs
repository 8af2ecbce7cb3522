use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::base::{IndexMatch, VectorIndex, VectorRecord};
use super::configs::PineconeConfig;

pub const PINECONE_CONTROL_HOST: &str = "https://api.pinecone.io";
pub const PINECONE_API_VERSION: &str = "2024-07";
pub const PINECONE_DIMENSION: usize = 384;
pub const PINECONE_CLOUD: &str = "aws";
pub const PINECONE_REGION: &str = "us-east-1";

const UPSERT_BATCH_SIZE: usize = 100;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const READY_POLL_ATTEMPTS: u32 = 120;

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchMetadata {
    text: Option<String>,
    source: Option<String>,
}

/// Pinecone serverless index reached over its REST API
pub struct PineconeIndex {
    client: Client,
    config: PineconeConfig,
    host: String,
}

impl PineconeIndex {
    /// Connect to an existing index, resolving its data-plane host if needed
    pub async fn connect(config: PineconeConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        let host = match &config.host {
            Some(host) => normalize_host(host),
            None => {
                let description = describe(&client, &config)
                    .await?
                    .ok_or_else(|| anyhow!("Pinecone index '{}' does not exist", config.index))?;
                normalize_host(&description.host)
            }
        };

        tracing::info!(index = %config.index, host = %host, "connected to pinecone index");
        Ok(Self {
            client,
            config,
            host,
        })
    }

    /// Create the index when missing, wait until it reports ready, then connect
    pub async fn ensure(config: PineconeConfig) -> Result<Self> {
        Self::ensure_with_interval(config, READY_POLL_INTERVAL).await
    }

    async fn ensure_with_interval(config: PineconeConfig, interval: Duration) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        if describe(&client, &config).await?.is_none() {
            tracing::info!(
                index = %config.index,
                dimension = config.dimension,
                "creating pinecone index"
            );
            create(&client, &config).await?;
        }

        let mut attempts = 0;
        let description = loop {
            match describe(&client, &config).await? {
                Some(description) if description.status.ready => break description,
                _ if attempts >= READY_POLL_ATTEMPTS => {
                    return Err(anyhow!(
                        "Pinecone index '{}' did not become ready",
                        config.index
                    ))
                }
                _ => {
                    attempts += 1;
                    tokio::time::sleep(interval).await;
                }
            }
        };

        let host = config
            .host
            .as_deref()
            .map(normalize_host)
            .unwrap_or_else(|| normalize_host(&description.host));
        Ok(Self {
            client,
            config,
            host,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        with_headers(request, &self.config.api_key)
    }
}

fn with_headers(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn describe(client: &Client, config: &PineconeConfig) -> Result<Option<IndexDescription>> {
    let url = format!(
        "{}/indexes/{}",
        config.control_host.trim_end_matches('/'),
        urlencoding::encode(&config.index)
    );
    let response = config
        .retry
        .send(with_headers(client.get(&url), &config.api_key))
        .await?;

    match response.status() {
        StatusCode::OK => Ok(Some(
            response
                .json()
                .await
                .context("Invalid index description from Pinecone")?,
        )),
        StatusCode::NOT_FOUND => Ok(None),
        status => Err(anyhow!(
            "Describing Pinecone index failed: {}\nBody: {}",
            status,
            response.text().await.unwrap_or_default()
        )),
    }
}

async fn create(client: &Client, config: &PineconeConfig) -> Result<()> {
    let url = format!("{}/indexes", config.control_host.trim_end_matches('/'));
    let payload = json!({
        "name": config.index,
        "dimension": config.dimension,
        "metric": "cosine",
        "spec": {
            "serverless": {
                "cloud": config.cloud,
                "region": config.region,
            }
        }
    });
    let response = config
        .retry
        .send(with_headers(client.post(&url), &config.api_key).json(&payload))
        .await?;

    match response.status() {
        // Another writer may have created it between describe and create
        status if status.is_success() || status == StatusCode::CONFLICT => Ok(()),
        status => Err(anyhow!(
            "Creating Pinecone index failed: {}\nBody: {}",
            status,
            response.text().await.unwrap_or_default()
        )),
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let url = format!("{}/query", self.host);
        let payload = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });

        let response = self
            .config
            .retry
            .send(self.authorized(self.client.post(&url)).json(&payload))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(anyhow!(
                "Pinecone query failed: {}\nBody: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: QueryResponse = response
            .json()
            .await
            .context("Invalid query response from Pinecone")?;
        Ok(body
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                IndexMatch::from_metadata(m.id, m.score, metadata.text, metadata.source)
            })
            .collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let url = format!("{}/vectors/upsert", self.host);

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let vectors: Vec<_> = batch
                .iter()
                .map(|record| {
                    json!({
                        "id": record.id,
                        "values": record.values,
                        "metadata": {
                            "text": record.text,
                            "source": record.source,
                        }
                    })
                })
                .collect();

            let response = self
                .config
                .retry
                .send(
                    self.authorized(self.client.post(&url))
                        .json(&json!({ "vectors": vectors })),
                )
                .await?;
            if !response.status().is_success() {
                return Err(anyhow!(
                    "Pinecone upsert failed: {}\nBody: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ));
            }
            tracing::debug!(count = batch.len(), "upserted vectors");
        }
        Ok(())
    }
}
