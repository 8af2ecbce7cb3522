use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::embeddings::base::Embedder;
use crate::errors::{AgentError, AgentResult};
use crate::index::base::{IndexMatch, VectorIndex};
use crate::models::tool::Tool;
use crate::tools::ToolHandler;

/// Returned instead of context when the index has no neighbours for a query
pub const NO_RELEVANT_CONTEXT_FOUND: &str = "NO_RELEVANT_CONTEXT_FOUND";
pub const RETRIEVE_TOOL_NAME: &str = "retrieve_query";
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Deserialize)]
struct RetrieveArgs {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

/// Embeds a query, searches the index and formats the neighbours as citeable context
pub struct RetrievalTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    tool: Tool,
}

impl RetrievalTool {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        let tool = Tool::new(
            RETRIEVE_TOOL_NAME,
            "Search the company knowledge base for information about the company, its services, \
             projects, clients or technical details. Returns relevant passages, each labelled with \
             its source document.",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "A self-contained search query describing the information needed"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "How many passages to return",
                        "default": DEFAULT_TOP_K,
                        "minimum": 1
                    }
                }
            }),
        );

        Self {
            embedder,
            index,
            tool,
        }
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<String> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.index.query(&vector, top_k).await?;
        tracing::info!(query, top_k, matches = matches.len(), "retrieved context");
        Ok(format_context(&matches))
    }
}

/// Render matches in rank order, or the sentinel when there are none
pub fn format_context(matches: &[IndexMatch]) -> String {
    if matches.is_empty() {
        return NO_RELEVANT_CONTEXT_FOUND.to_string();
    }

    matches
        .iter()
        .map(|m| format!("[Source: {}]\n{}", m.source, m.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl ToolHandler for RetrievalTool {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> AgentResult<String> {
        let args: RetrieveArgs = serde_json::from_value(arguments)
            .map_err(|e| AgentError::InvalidParameters(e.to_string()))?;

        if args.query.trim().is_empty() {
            return Err(AgentError::InvalidParameters(
                "The parameter query must not be empty".into(),
            ));
        }
        let top_k = args.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Err(AgentError::InvalidParameters(
                "The parameter top_k must be at least 1".into(),
            ));
        }

        self.retrieve(&args.query, top_k)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("{:#}", e)))
    }
}
