use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentResult;
use crate::models::tool::Tool;

/// A capability the agent can offer to the model.
///
/// The declaration returned by [`ToolHandler::tool`] is sent alongside every model
/// invocation, so the schema is explicit rather than derived from a function signature.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The declared name, description and input schema
    fn tool(&self) -> &Tool;

    /// Execute the tool with the arguments the model supplied.
    ///
    /// Return `InvalidParameters` for arguments the model can fix and
    /// `ExecutionError` when an upstream dependency failed.
    async fn call(&self, arguments: Value) -> AgentResult<String>;
}
