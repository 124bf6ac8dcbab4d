//! Backfill embeddings for messages that do not have one yet

use futures::stream::StreamExt;
use futures::stream::{
    self,
};
use tracing::info;
use tracing::warn;

use super::Embedder;
use super::MAX_BATCH_SIZE;
use crate::database::KnowledgeStore;
use crate::errors::Result;

/// Outcome of a backfill run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillStats {
    pub pending: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Embed every message that is missing from the embeddings table.
///
/// Blank messages are skipped. A failure on one message, including a vector
/// whose length differs from `embedder.dimension()`, is logged and counted;
/// it does not abort the run.
pub async fn backfill_embeddings(store: &KnowledgeStore, embedder: &dyn Embedder) -> Result<BackfillStats> {
    info!("Starting embeddings backfill");

    let messages = store.messages_without_embeddings().await?;
    let mut stats = BackfillStats {
        pending: messages.len(),
        ..BackfillStats::default()
    };
    info!("Found {} messages without embeddings", messages.len());

    let (blank, work): (Vec<_>, Vec<_>) = messages
        .into_iter()
        .partition(|m| m.content.trim().is_empty());
    stats.skipped += blank.len();

    let total_batches = work.len().div_ceil(MAX_BATCH_SIZE);
    for (batch_idx, chunk) in work.chunks(MAX_BATCH_SIZE).enumerate() {
        info!(
            "Processing batch {}/{} ({} messages)",
            batch_idx + 1,
            total_batches,
            chunk.len()
        );

        let results: Vec<_> = stream::iter(chunk.iter())
            .map(|message| async move { (message.id, embedder.embed(&message.content).await) })
            .buffered(chunk.len().max(1))
            .collect()
            .await;

        for (message_id, result) in results {
            match result {
                Ok(embedding) if embedding.len() != embedder.dimension() => {
                    warn!(
                        "Embedding for message {} has {} dims, expected {}; not stored",
                        message_id,
                        embedding.len(),
                        embedder.dimension()
                    );
                    stats.failed += 1;
                }
                Ok(embedding) => {
                    if store.insert_embedding(message_id, &embedding).await? {
                        stats.updated += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to embed message {}: {}", message_id, e);
                    stats.failed += 1;
                }
            }
        }
    }

    info!(
        "Backfill complete: {} updated, {} skipped, {} failed",
        stats.updated, stats.skipped, stats.failed
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::errors::EchoRagError;
    use crate::models::KnowledgeMessage;
    use crate::models::LoadFilter;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("fail") {
                return Err(EchoRagError::EmbeddingError("boom".to_string()));
            }
            if text.contains("short") {
                return Ok(vec![1.0]);
            }
            Ok(vec![text.chars().count() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn message(id: i64, content: &str) -> KnowledgeMessage {
        KnowledgeMessage {
            id,
            channel_id: 1,
            channel_name: "general".to_string(),
            author_id: 1,
            author_name: "bob".to_string(),
            content: content.to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            timestamp: id as f64,
            category: None,
            importance: 0,
        }
    }

    #[tokio::test]
    async fn test_backfill_counts_and_persists() {
        let store = KnowledgeStore::in_memory().await.unwrap();
        store
            .insert_messages_batch(&[
                message(1, "hello"),
                message(2, "   "),
                message(3, "please fail"),
                message(4, "world!"),
            ])
            .await
            .unwrap();

        let stats = backfill_embeddings(&store, &LengthEmbedder).await.unwrap();
        assert_eq!(
            stats,
            BackfillStats {
                pending: 4,
                updated: 2,
                skipped: 1,
                failed: 1,
            }
        );

        let loaded = store.load_embedded_messages(&LoadFilter::default()).await.unwrap();
        let texts: Vec<_> = loaded.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["world!", "hello"]);

        // Second run only retries what is still missing
        let again = backfill_embeddings(&store, &LengthEmbedder).await.unwrap();
        assert_eq!(again.pending, 2);
        assert_eq!(again.updated, 0);
    }

    #[tokio::test]
    async fn test_backfill_rejects_wrong_dimension() {
        let store = KnowledgeStore::in_memory().await.unwrap();
        store
            .insert_messages_batch(&[message(1, "hello"), message(2, "too short")])
            .await
            .unwrap();

        let stats = backfill_embeddings(&store, &LengthEmbedder).await.unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(store.embedding_count().await.unwrap(), 1);

        let loaded = store.load_embedded_messages(&LoadFilter::default()).await.unwrap();
        assert!(loaded.iter().all(|m| m.embedding.len() == 2));
    }
}
