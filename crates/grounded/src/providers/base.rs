use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::Tool;

/// Token counts reported by the model server; any of them may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<u32>,
        output_tokens: Option<u32>,
        total_tokens: Option<u32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Add another call's counts, keeping a count once either side reported it
    pub fn accumulate(&mut self, other: &Usage) {
        fn sum(a: Option<u32>, b: Option<u32>) -> Option<u32> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                (a, b) => a.or(b),
            }
        }
        self.input_tokens = sum(self.input_tokens, other.input_tokens);
        self.output_tokens = sum(self.output_tokens, other.output_tokens);
        self.total_tokens = sum(self.total_tokens, other.total_tokens);
    }
}

/// A chat model that can answer or ask for tool calls
#[async_trait]
pub trait Provider: Send + Sync {
    /// Produce the next assistant message for `messages` under `system`,
    /// offering the model `tools`
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_sums_reported_counts() {
        let mut total = Usage::default();
        total.accumulate(&Usage::new(Some(120), Some(8), Some(128)));
        total.accumulate(&Usage::new(Some(300), None, None));

        assert_eq!(total, Usage::new(Some(420), Some(8), Some(128)));
    }

    #[test]
    fn test_usage_serializes_missing_counts_as_null() -> Result<()> {
        let value = serde_json::to_value(Usage::new(Some(5), None, Some(5)))?;
        assert_eq!(
            value,
            serde_json::json!({"input_tokens": 5, "output_tokens": null, "total_tokens": 5})
        );
        Ok(())
    }
}
