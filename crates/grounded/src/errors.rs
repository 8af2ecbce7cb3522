use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool loop exceeded: the model requested tools more than {0} times in one turn")]
    ToolLoopExceeded(usize),

    #[error("Turn exceeded its deadline of {0}ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Errors the model can recover from are fed back to it as tool observations;
    /// everything else aborts the turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::ToolNotFound(_) | AgentError::InvalidParameters(_)
        )
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid value for {env_var}: {reason}")]
    InvalidValue { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a dotted configuration key onto the environment variable that sets it,
/// e.g. `provider.api_key` -> `GROUNDED_PROVIDER__API_KEY`.
pub fn to_env_var(field: &str) -> String {
    let field = field.trim_matches('`');
    format!("GROUNDED_{}", field.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "GROUNDED_PROVIDER__API_KEY");
        assert_eq!(to_env_var("`index.index`"), "GROUNDED_INDEX__INDEX");
        assert_eq!(to_env_var("type"), "GROUNDED_TYPE");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(AgentError::ToolNotFound("x".into()).is_recoverable());
        assert!(AgentError::InvalidParameters("x".into()).is_recoverable());
        assert!(!AgentError::ExecutionError("x".into()).is_recoverable());
        assert!(!AgentError::ToolLoopExceeded(3).is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = AgentError::InvalidParameters("top_k must be positive".into());
        let json = serde_json::to_string(&error).unwrap();
        let back: AgentError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }
}
