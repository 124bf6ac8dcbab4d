//! SQLite-backed knowledge store for chat messages and their embeddings

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use tracing::debug;
use tracing::info;

use crate::models::EmbeddedMessage;
use crate::models::KnowledgeMessage;
use crate::models::KnowledgeStats;
use crate::models::LoadFilter;
use crate::Result;

/// File path of a `sqlite://` URL; `None` for in-memory databases
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(Path::new(path))
    }
}

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY,
        channel_id INTEGER NOT NULL,
        channel_name TEXT NOT NULL,
        author_id INTEGER NOT NULL,
        author_name TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        timestamp REAL NOT NULL,
        category TEXT DEFAULT NULL,
        importance INTEGER NOT NULL DEFAULT 0,
        created_in_db TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS embeddings (
        message_id INTEGER PRIMARY KEY,
        embedding_vector TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (message_id) REFERENCES messages(id)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_messages_channel_id ON messages(channel_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_messages_category ON messages(category)",
    "CREATE INDEX IF NOT EXISTS idx_messages_importance ON messages(importance)",
];

/// Connection pool wrapper over the message/embedding tables
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    pool: SqlitePool,
}

impl KnowledgeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a store from configuration
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        if let Some(parent) = sqlite_file_path(config.database_url()).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.connection_timeout))
            .connect(config.database_url())
            .await?;
        Ok(Self::new(pool))
    }

    /// Connect to a database URL with default pool options
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Single-connection in-memory store, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        // Every pooled connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a reference to the pool for raw queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Knowledge store schema ready");
        Ok(())
    }

    /// Insert a message, skipping ids that already exist.
    ///
    /// Returns `true` when a new row was written.
    pub async fn insert_message(&self, message: &KnowledgeMessage) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO messages (
                id, channel_id, channel_name, author_id, author_name,
                content, created_at, timestamp, category, importance
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(message.id)
        .bind(message.channel_id)
        .bind(&message.channel_name)
        .bind(message.author_id)
        .bind(&message.author_name)
        .bind(&message.content)
        .bind(&message.created_at)
        .bind(message.timestamp)
        .bind(&message.category)
        .bind(message.importance)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert messages in one transaction.
    ///
    /// Returns `(inserted, skipped)`.
    pub async fn insert_messages_batch(&self, messages: &[KnowledgeMessage]) -> Result<(usize, usize)> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        let mut skipped = 0;

        for message in messages {
            let result = sqlx::query(
                r"
                INSERT OR IGNORE INTO messages (
                    id, channel_id, channel_name, author_id, author_name,
                    content, created_at, timestamp, category, importance
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(message.id)
            .bind(message.channel_id)
            .bind(&message.channel_name)
            .bind(message.author_id)
            .bind(&message.author_name)
            .bind(&message.content)
            .bind(&message.created_at)
            .bind(message.timestamp)
            .bind(&message.category)
            .bind(message.importance)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            } else {
                skipped += 1;
            }
        }

        tx.commit().await?;
        debug!("Batch insert: {} inserted, {} skipped", inserted, skipped);
        Ok((inserted, skipped))
    }

    /// Messages that have no embedding row yet, oldest first
    pub async fn messages_without_embeddings(&self) -> Result<Vec<KnowledgeMessage>> {
        let messages = sqlx::query_as::<_, KnowledgeMessage>(
            r"
            SELECT m.id, m.channel_id, m.channel_name, m.author_id, m.author_name,
                   m.content, m.created_at, m.timestamp, m.category, m.importance
            FROM messages m
            LEFT JOIN embeddings e ON m.id = e.message_id
            WHERE e.message_id IS NULL
            ORDER BY m.timestamp ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Store the embedding for a message, skipping messages that already have one.
    ///
    /// Returns `true` when a new row was written.
    pub async fn insert_embedding(&self, message_id: i64, embedding: &[f32]) -> Result<bool> {
        let vector = serde_json::to_string(embedding)?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO embeddings (message_id, embedding_vector) VALUES (?, ?)",
        )
        .bind(message_id)
        .bind(vector)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load `(text, vector)` pairs for every embedded message, newest first
    pub async fn load_embedded_messages(&self, filter: &LoadFilter) -> Result<Vec<EmbeddedMessage>> {
        let mut sql = String::from(
            r"
            SELECT m.content, e.embedding_vector
            FROM messages m
            INNER JOIN embeddings e ON m.id = e.message_id
            WHERE 1=1
            ",
        );
        if filter.category.is_some() {
            sql.push_str(" AND m.category = ?");
        }
        if filter.min_importance.is_some() {
            sql.push_str(" AND m.importance >= ?");
        }
        sql.push_str(" ORDER BY m.timestamp DESC");

        let mut query = sqlx::query(&sql);
        if let Some(category) = &filter.category {
            query = query.bind(category);
        }
        if let Some(min_importance) = filter.min_importance {
            query = query.bind(min_importance);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let text: String = row.try_get("content")?;
            let vector: String = row.try_get("embedding_vector")?;
            let embedding: Vec<f32> = serde_json::from_str(&vector)?;
            messages.push(EmbeddedMessage { text, embedding });
        }

        debug!("Loaded {} embedded messages", messages.len());
        Ok(messages)
    }

    /// Update category and/or importance tags on a message.
    ///
    /// Returns `false` if the message does not exist.
    pub async fn update_message_metadata(
        &self,
        message_id: i64,
        category: Option<&str>,
        importance: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE messages
            SET category = COALESCE(?, category),
                importance = COALESCE(?, importance)
            WHERE id = ?
            ",
        )
        .bind(category)
        .bind(importance)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn message_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn embedding_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn stats(&self) -> Result<KnowledgeStats> {
        Ok(KnowledgeStats {
            message_count: self.message_count().await?,
            embedding_count: self.embedding_count().await?,
        })
    }
}
