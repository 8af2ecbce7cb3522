use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub enum EmbeddingConfig {
    Tei(TeiEmbeddingConfig),
    OpenAi(OpenAiEmbeddingConfig),
}

/// A text-embeddings-inference server hosting the model
#[derive(Debug, Clone)]
pub struct TeiEmbeddingConfig {
    pub host: String,
    pub model: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub model: String,
    pub retry: RetryPolicy,
}
