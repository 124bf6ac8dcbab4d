//! In-memory embedding index loaded once from the knowledge store

use async_trait::async_trait;

use crate::database::KnowledgeStore;
use crate::errors::EchoRagError;
use crate::errors::Result;
use crate::models::EmbeddedMessage;
use crate::models::LoadFilter;

/// Read side of the embedding store
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    async fn load(&self) -> Result<Vec<EmbeddedMessage>>;
}

#[async_trait]
impl EmbeddingSource for KnowledgeStore {
    async fn load(&self) -> Result<Vec<EmbeddedMessage>> {
        self.load_embedded_messages(&LoadFilter::default()).await
    }
}

/// Fixed set of messages, for tests and pre-computed corpora
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    messages: Vec<EmbeddedMessage>,
}

impl StaticSource {
    pub fn new(messages: Vec<EmbeddedMessage>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl EmbeddingSource for StaticSource {
    async fn load(&self) -> Result<Vec<EmbeddedMessage>> {
        Ok(self.messages.clone())
    }
}

/// Flattened `(texts, vectors)` pair with a single, validated dimension
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    texts: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl EmbeddingIndex {
    /// Build an index, rejecting vectors whose length differs from `dimension`
    pub fn from_messages(messages: Vec<EmbeddedMessage>, dimension: usize) -> Result<Self> {
        let mut texts = Vec::with_capacity(messages.len());
        let mut vectors = Vec::with_capacity(messages.len());

        for message in messages {
            if message.embedding.len() != dimension {
                return Err(EchoRagError::DimensionMismatch {
                    expected: dimension,
                    actual: message.embedding.len(),
                });
            }
            texts.push(message.text);
            vectors.push(message.embedding);
        }

        Ok(Self {
            texts,
            vectors,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn text(&self, idx: usize) -> Option<&str> {
        self.texts.get(idx).map(String::as_str)
    }

    /// Indices of the `top_k` vectors most similar to `query`.
    ///
    /// Ties keep insertion order.
    pub fn top_k(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(EchoRagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, cosine_similarity(query, vector)))
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity of two equal-length vectors; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, [f32; 2])]) -> EmbeddingIndex {
        let messages = entries
            .iter()
            .map(|(text, v)| EmbeddedMessage::new(*text, v.to_vec()))
            .collect();
        EmbeddingIndex::from_messages(messages, 2).unwrap()
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let idx = index(&[("east", [1.0, 0.0]), ("north", [0.0, 1.0]), ("northeast", [1.0, 1.0])]);
        let hits = idx.top_k(&[0.0, 1.0], 2).unwrap();
        let texts: Vec<_> = hits.iter().map(|(i, _)| idx.text(*i).unwrap()).collect();
        assert_eq!(texts, vec!["north", "northeast"]);
    }

    #[test]
    fn test_top_k_ties_keep_insertion_order() {
        let idx = index(&[("first", [1.0, 0.0]), ("second", [2.0, 0.0]), ("third", [3.0, 0.0])]);
        let hits = idx.top_k(&[1.0, 0.0], 3).unwrap();
        let order: Vec<_> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_top_k_larger_than_index() {
        let idx = index(&[("only", [1.0, 0.0])]);
        assert_eq!(idx.top_k(&[1.0, 0.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let idx = index(&[("only", [1.0, 0.0])]);
        let err = idx.top_k(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            EchoRagError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_stored_dimension_mismatch() {
        let messages = vec![
            EmbeddedMessage::new("ok", vec![1.0, 0.0]),
            EmbeddedMessage::new("bad", vec![1.0]),
        ];
        assert!(EmbeddingIndex::from_messages(messages, 2).is_err());
    }

    #[tokio::test]
    async fn test_static_source_load() {
        let source = StaticSource::new(vec![EmbeddedMessage::new("a", vec![1.0])]);
        assert_eq!(source.load().await.unwrap().len(), 1);
    }
}
