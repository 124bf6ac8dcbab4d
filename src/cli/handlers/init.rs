//! Knowledge store initialization and import handlers

use std::path::Path;

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::database::KnowledgeStore;
use crate::errors::EchoRagError;
use crate::models::KnowledgeMessage;
use crate::Result;

/// Handle knowledge store initialization command
pub async fn handle_init_command(store: &KnowledgeStore, force: bool) -> Result<()> {
    if !force {
        print_warning("This will create the knowledge store tables and indexes.");
        print_warning("This operation is safe - it uses CREATE IF NOT EXISTS.");
        println!("\nUse --force to proceed.");
        return Ok(());
    }

    print_info("🗄️  Initializing knowledge store...");
    store.init_schema().await?;
    print_success("Tables and indexes ready");
    Ok(())
}

/// Parse messages from a JSON array, or from JSON lines (one object per line)
pub fn parse_messages(content: &str) -> Result<Vec<KnowledgeMessage>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<KnowledgeMessage>(line).map_err(EchoRagError::from))
        .collect()
}

/// Handle message import command
pub async fn handle_import_command(store: &KnowledgeStore, file: &Path) -> Result<()> {
    print_info(&format!("📥 Importing messages from {}", file.display()));

    let content = tokio::fs::read_to_string(file).await?;
    let messages = parse_messages(&content)?;
    if messages.is_empty() {
        print_warning("No messages in file");
        return Ok(());
    }

    let (inserted, skipped) = store.insert_messages_batch(&messages).await?;
    print_success(&format!(
        "Imported {inserted} messages ({skipped} already present)"
    ));
    if inserted > 0 {
        println!("Next: echorag backfill");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_messages() {
        let json = r#"[{
            "id": 1, "channel_id": 10, "channel_name": "general",
            "author_id": 7, "author_name": "alice", "content": "おはよう",
            "created_at": "2024-01-01T00:00:00Z", "timestamp": 1704067200.0,
            "category": null, "importance": 0
        }]"#;
        let messages = parse_messages(json).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "おはよう");
    }

    #[test]
    fn test_parse_json_lines() {
        let lines = concat!(
            r#"{"id": 1, "channel_id": 1, "channel_name": "c", "author_id": 1, "author_name": "a", "content": "one", "created_at": "t", "timestamp": 1.0, "category": null, "importance": 0}"#,
            "\n\n",
            r#"{"id": 2, "channel_id": 1, "channel_name": "c", "author_id": 1, "author_name": "a", "content": "two", "created_at": "t", "timestamp": 2.0, "category": "faq", "importance": 3}"#,
            "\n",
        );
        let messages = parse_messages(lines).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].category.as_deref(), Some("faq"));
        assert!(parse_messages("  \n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        std::fs::write(
            &path,
            r#"[{"id": 1, "channel_id": 1, "channel_name": "c", "author_id": 1,
                 "author_name": "a", "content": "hi", "created_at": "t",
                 "timestamp": 1.0, "category": null, "importance": 0}]"#,
        )
        .unwrap();

        let store = KnowledgeStore::in_memory().await.unwrap();
        handle_import_command(&store, &path).await.unwrap();
        handle_import_command(&store, &path).await.unwrap();
        assert_eq!(store.message_count().await.unwrap(), 1);
    }
}
