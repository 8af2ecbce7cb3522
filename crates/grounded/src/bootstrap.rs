//! Wiring the configured collaborators together.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::agent::Agent;
use crate::configuration::Settings;
use crate::embeddings::base::Embedder;
use crate::embeddings::factory::get_embedder;
use crate::index::base::VectorIndex;
use crate::index::factory::{connect_index, ensure_index};
use crate::ingest::Ingestor;
use crate::prompt_template::{system_prompt, SystemPromptContext};
use crate::providers::factory::get_provider;
use crate::retrieval::RetrievalTool;
use crate::splitter::RecursiveCharacterSplitter;
use crate::store::factory::open_store;

/// Connect to the configured index; `create` also creates it when missing
pub async fn build_index(settings: &Settings, create: bool) -> Result<Arc<dyn VectorIndex>> {
    let config = settings.index.clone().into_config(settings.retry);
    if create {
        ensure_index(config).await
    } else {
        connect_index(config).await
    }
}

pub fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    get_embedder(settings.embedding.clone().into_config(settings.retry))
}

/// Build an agent with the retrieval tool over `index`
pub fn build_agent(settings: &Settings, index: Arc<dyn VectorIndex>) -> Result<Agent> {
    let provider = get_provider(settings.provider.clone().into_config(settings.retry))?;
    let embedder = build_embedder(settings)?;
    let store = open_store(settings.store.clone().into_config())?;

    let prompt = system_prompt(
        &SystemPromptContext::new(&settings.agent.organization),
        settings.agent.system_prompt_path.clone(),
    )
    .context("Failed to render the system prompt")?;

    let mut agent = Agent::new(provider, store, prompt);
    agent.add_tool(Box::new(RetrievalTool::new(embedder, index)));
    agent.set_max_tool_iterations(settings.agent.max_tool_iterations);

    tracing::info!(
        provider = ?settings.provider.provider_type(),
        model = settings.provider.model(),
        max_tool_iterations = settings.agent.max_tool_iterations,
        "agent ready"
    );
    Ok(agent)
}

pub fn build_ingestor(settings: &Settings, index: Arc<dyn VectorIndex>) -> Result<Ingestor> {
    let splitter =
        RecursiveCharacterSplitter::new(settings.ingest.chunk_size, settings.ingest.chunk_overlap)?;
    Ok(Ingestor::new(splitter, build_embedder(settings)?, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{
        AgentSettings, EmbeddingSettings, IndexSettings, IngestSettings, ProviderSettings,
        ServerSettings, StoreSettings,
    };
    use crate::retry::RetryPolicy;

    fn local_settings() -> Settings {
        Settings {
            server: ServerSettings::default(),
            provider: ProviderSettings::Ollama {
                host: "http://localhost:11434".to_string(),
                model: "qwen2.5".to_string(),
                temperature: None,
                max_tokens: None,
            },
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::Memory,
            store: StoreSettings::Memory,
            agent: AgentSettings {
                max_tool_iterations: 4,
                ..AgentSettings::default()
            },
            ingest: IngestSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_build_agent_registers_retrieval() -> Result<()> {
        let settings = local_settings();
        let index = build_index(&settings, false).await?;
        let agent = build_agent(&settings, index)?;

        let tools = agent.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "retrieve_query");
        assert!(agent.store().thread_ids().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_prompt_must_exist() -> Result<()> {
        let mut settings = local_settings();
        settings.agent.system_prompt_path = Some("/nonexistent/system.md".into());
        let index = build_index(&settings, false).await?;
        assert!(build_agent(&settings, index).is_err());
        Ok(())
    }

    #[test]
    fn test_build_ingestor_validates_chunking() {
        let mut settings = local_settings();
        settings.ingest.chunk_overlap = settings.ingest.chunk_size;
        let index: Arc<dyn VectorIndex> = Arc::new(crate::index::memory::InMemoryIndex::new());
        assert!(build_ingestor(&settings, index).is_err());
    }
}
