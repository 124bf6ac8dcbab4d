//! Embedding backfill handler

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::database::KnowledgeStore;
use crate::embeddings::backfill_embeddings;
use crate::embeddings::EmbeddingClient;
use crate::AppConfig;
use crate::Result;

/// Handle embeddings backfill command
pub async fn handle_backfill_command(config: &AppConfig, store: &KnowledgeStore) -> Result<()> {
    let client = EmbeddingClient::from_app_config(config)?;
    print_info(&format!(
        "🧠 Backfilling embeddings with {} ({} dims)",
        config.embeddings.model,
        config.embedding_dimension()
    ));

    let stats = backfill_embeddings(store, &client).await?;

    if stats.pending == 0 {
        print_success("All messages already have embeddings");
        return Ok(());
    }

    print_success(&format!(
        "Updated {}, skipped {}, failed {} (of {} pending)",
        stats.updated, stats.skipped, stats.failed, stats.pending
    ));
    if stats.failed > 0 {
        print_warning("Some messages failed; run backfill again to retry them");
    }
    Ok(())
}
