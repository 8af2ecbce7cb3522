use crate::embeddings::{
    configs::{EmbeddingConfig, OpenAiEmbeddingConfig, TeiEmbeddingConfig},
    openai::OPENAI_EMBEDDING_MODEL,
    tei,
};
use crate::errors::{to_env_var, ConfigError};
use crate::index::{
    configs::{IndexConfig, PineconeConfig},
    pinecone,
};
use crate::providers::{
    configs::{OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig},
    factory::ProviderType,
    ollama, openai,
};
use crate::retry::RetryPolicy;
use crate::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::store::configs::StoreConfig;
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Groq {
        #[serde(default = "default_groq_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_groq_model")]
        model: String,
        #[serde(default = "default_groq_temperature")]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Groq { .. } => ProviderType::Groq,
            ProviderSettings::Ollama { .. } => ProviderType::Ollama,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderSettings::OpenAi { model, .. }
            | ProviderSettings::Groq { model, .. }
            | ProviderSettings::Ollama { model, .. } => model,
        }
    }

    pub fn into_config(self, retry: RetryPolicy) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }
            | ProviderSettings::Groq {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                retry,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
                retry,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum EmbeddingSettings {
    Tei {
        #[serde(default = "default_tei_host")]
        host: String,
        #[serde(default = "default_tei_model")]
        model: String,
    },
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_embedding_model")]
        model: String,
    },
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        EmbeddingSettings::Tei {
            host: default_tei_host(),
            model: default_tei_model(),
        }
    }
}

impl EmbeddingSettings {
    pub fn into_config(self, retry: RetryPolicy) -> EmbeddingConfig {
        match self {
            EmbeddingSettings::Tei { host, model } => {
                EmbeddingConfig::Tei(TeiEmbeddingConfig { host, model, retry })
            }
            EmbeddingSettings::OpenAi {
                host,
                api_key,
                model,
            } => EmbeddingConfig::OpenAi(OpenAiEmbeddingConfig {
                host,
                api_key,
                model,
                retry,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum IndexSettings {
    Pinecone {
        api_key: String,
        index: String,
        #[serde(default)]
        host: Option<String>,
        #[serde(default = "default_pinecone_control_host")]
        control_host: String,
        #[serde(default = "default_dimension")]
        dimension: usize,
        #[serde(default = "default_cloud")]
        cloud: String,
        #[serde(default = "default_region")]
        region: String,
    },
    Memory,
}

impl IndexSettings {
    pub fn into_config(self, retry: RetryPolicy) -> IndexConfig {
        match self {
            IndexSettings::Pinecone {
                api_key,
                index,
                host,
                control_host,
                dimension,
                cloud,
                region,
            } => IndexConfig::Pinecone(PineconeConfig {
                api_key,
                index,
                host,
                control_host,
                dimension,
                cloud,
                region,
                retry,
            }),
            IndexSettings::Memory => IndexConfig::Memory,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum StoreSettings {
    #[default]
    Memory,
    Jsonl {
        #[serde(default = "default_store_dir")]
        dir: PathBuf,
    },
}

impl StoreSettings {
    pub fn into_config(self) -> StoreConfig {
        match self {
            StoreSettings::Memory => StoreConfig::Memory,
            StoreSettings::Jsonl { dir } => StoreConfig::Jsonl { dir },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    #[serde(default)]
    pub turn_timeout_secs: Option<u64>,
    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,
    #[serde(default = "default_organization")]
    pub organization: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            turn_timeout_secs: None,
            system_prompt_path: None,
            organization: default_organization(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Sections that can be left out entirely
            .set_default("embedding.type", "tei")?
            .set_default("store.type", "memory")?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("GROUNDED")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => settings.validate(),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

impl Settings {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                env_var: to_env_var("agent.max_tool_iterations"),
                reason: "must be at least 1, retrieval would never be allowed".to_string(),
            });
        }
        Ok(self)
    }
}

/// Extract the dotted key from "missing field `x`" errors, which may carry the
/// enclosing section as "missing field `x` for key `section`"
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    match rest
        .split_once("for key `")
        .and_then(|(_, key)| key.split_once('`'))
    {
        Some((key, _)) if !key.is_empty() => Some(format!("{}.{}", key, field)),
        _ => Some(field.to_string()),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_openai_host() -> String {
    openai::OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    openai::OPENAI_MODEL.to_string()
}

fn default_groq_host() -> String {
    openai::GROQ_HOST.to_string()
}

fn default_groq_model() -> String {
    openai::GROQ_MODEL.to_string()
}

fn default_groq_temperature() -> Option<f32> {
    Some(0.1)
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}

fn default_tei_host() -> String {
    tei::TEI_HOST.to_string()
}

fn default_tei_model() -> String {
    tei::TEI_MODEL.to_string()
}

fn default_openai_embedding_model() -> String {
    OPENAI_EMBEDDING_MODEL.to_string()
}

fn default_pinecone_control_host() -> String {
    pinecone::PINECONE_CONTROL_HOST.to_string()
}

fn default_dimension() -> usize {
    pinecone::PINECONE_DIMENSION
}

fn default_cloud() -> String {
    pinecone::PINECONE_CLOUD.to_string()
}

fn default_region() -> String {
    pinecone::PINECONE_REGION.to_string()
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("conversations")
}

fn default_max_tool_iterations() -> usize {
    crate::agent::DEFAULT_MAX_TOOL_ITERATIONS
}

fn default_organization() -> String {
    "a company".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}
