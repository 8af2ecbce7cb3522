use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::base::{IndexMatch, VectorIndex, VectorRecord};

/// Exhaustive cosine-similarity index held in process memory
#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let records = self.records.read().await;
        let mut scored: Vec<(f32, &VectorRecord)> = records
            .iter()
            .map(|record| (cosine_similarity(vector, &record.values), record))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| IndexMatch {
                id: record.id.clone(),
                score,
                text: record.text.clone(),
                source: record.source.clone(),
            })
            .collect())
    }

    async fn upsert(&self, new_records: Vec<VectorRecord>) -> Result<()> {
        let mut records = self.records.write().await;
        if let (Some(existing), Some(incoming)) = (records.first(), new_records.first()) {
            if existing.values.len() != incoming.values.len() {
                return Err(anyhow!(
                    "Vector dimension {} does not match index dimension {}",
                    incoming.values.len(),
                    existing.values.len()
                ));
            }
        }

        for record in new_records {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record,
                None => records.push(record),
            }
        }
        Ok(())
    }
}
