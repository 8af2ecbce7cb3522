use super::{
    base::Embedder, configs::EmbeddingConfig, openai::OpenAiEmbedder, tei::TeiEmbedder,
};
use anyhow::Result;
use std::sync::Arc;

pub fn get_embedder(config: EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config {
        EmbeddingConfig::Tei(tei_config) => Ok(Arc::new(TeiEmbedder::new(tei_config)?)),
        EmbeddingConfig::OpenAi(openai_config) => {
            Ok(Arc::new(OpenAiEmbedder::new(openai_config)?))
        }
    }
}
