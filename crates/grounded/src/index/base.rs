use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_SOURCE: &str = "unknown";

/// One neighbour returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    /// Similarity, higher is closer
    pub score: f32,
    pub text: String,
    pub source: String,
}

impl IndexMatch {
    /// Build a match from optional metadata, falling back to an empty text and
    /// an `unknown` source
    pub fn from_metadata(
        id: impl Into<String>,
        score: f32,
        text: Option<String>,
        source: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            score,
            text: text.unwrap_or_default(),
            source: source.unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        }
    }
}

/// A vector together with the chunk it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
    pub source: String,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The `top_k` nearest records to `vector`, best first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;

    /// Insert or replace records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_defaults() {
        let m = IndexMatch::from_metadata("1", 0.5, None, None);
        assert_eq!(m.text, "");
        assert_eq!(m.source, "unknown");

        let m = IndexMatch::from_metadata("2", 0.9, Some("body".into()), Some("faq.md".into()));
        assert_eq!(m.text, "body");
        assert_eq!(m.source, "faq.md");
    }
}
