//! Similarity retrieval over the in-memory embedding index

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::Embedder;
use crate::errors::EchoRagError;
use crate::errors::Result;
use crate::rag::EmbeddingIndex;

/// Embeds a query and returns the most similar stored texts
#[derive(Clone)]
pub struct SimilarityRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<EmbeddingIndex>,
}

impl SimilarityRetriever {
    /// Create a retriever; the embedder and the index must agree on dimension
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<EmbeddingIndex>) -> Result<Self> {
        if !index.is_empty() && embedder.dimension() != index.dimension() {
            return Err(EchoRagError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedder.dimension(),
            });
        }
        Ok(Self { embedder, index })
    }

    /// Return up to `top_k` texts ordered by descending cosine similarity.
    ///
    /// An empty index yields an empty list without calling the embedder.
    pub async fn search_similar(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        if self.index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        debug!("Performing similarity search: {}", query);
        let query_embedding = self.embedder.embed(query).await?;

        // Linear scan over every stored vector; keep it off the async workers
        let index = Arc::clone(&self.index);
        let hits = tokio::task::spawn_blocking(move || {
            index.top_k(&query_embedding, top_k).map(|scored| {
                scored
                    .into_iter()
                    .filter_map(|(idx, score)| {
                        index.text(idx).map(|text| (text.to_string(), score))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await??;

        if let Some((_, best)) = hits.first() {
            debug!("Retrieved {} results, best score {:.3}", hits.len(), best);
        }

        Ok(hits.into_iter().map(|(text, _)| text).collect())
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::EmbeddedMessage;

    /// Maps a handful of keywords onto fixed axes
    struct KeywordEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; self.dimension];
            if text.contains("cat") {
                v[0] = 1.0;
            }
            if text.contains("dog") {
                v[1] = 1.0;
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    fn retriever(dimension: usize) -> SimilarityRetriever {
        let index = EmbeddingIndex::from_messages(
            vec![
                EmbeddedMessage::new("cats purr", vec![1.0, 0.0]),
                EmbeddedMessage::new("dogs bark", vec![0.0, 1.0]),
                EmbeddedMessage::new("pets", vec![1.0, 1.0]),
            ],
            2,
        )
        .unwrap();
        SimilarityRetriever::new(Arc::new(KeywordEmbedder { dimension }), Arc::new(index)).unwrap()
    }

    #[tokio::test]
    async fn test_search_similar_ranks() {
        let results = retriever(2).search_similar("my dog", 2).await.unwrap();
        assert_eq!(results, vec!["dogs bark", "pets"]);
    }

    #[tokio::test]
    async fn test_search_similar_empty_index() {
        let index = Arc::new(EmbeddingIndex::default());
        let retriever =
            SimilarityRetriever::new(Arc::new(KeywordEmbedder { dimension: 2 }), index).unwrap();
        assert!(retriever.search_similar("cat", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_similar_fewer_than_top_k() {
        let results = retriever(2).search_similar("cat", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], "cats purr");
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let index = EmbeddingIndex::from_messages(vec![EmbeddedMessage::new("x", vec![1.0, 0.0])], 2)
            .unwrap();
        let result =
            SimilarityRetriever::new(Arc::new(KeywordEmbedder { dimension: 3 }), Arc::new(index));
        assert!(matches!(result, Err(EchoRagError::DimensionMismatch { .. })));
    }
}
