//! SQLite-backed chunk storage.
//!
//! The ingestion collaborator writes chunks into a `knowledge_chunks`
//! table; the engine reads them all back to build a [`CorpusSnapshot`].
//! Embeddings are stored as little-endian `f32` blobs, tags as a JSON array.
//!
//! [`CorpusSnapshot`]: crate::CorpusSnapshot

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use warren_core::error::CorpusError;
use warren_core::knowledge::{ChunkCategory, KnowledgeChunk};

pub struct SqliteCorpus {
    pool: SqlitePool,
}

impl SqliteCorpus {
    /// Open (or create) the database at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, CorpusError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{path}")
        };
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| CorpusError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| CorpusError::Storage(format!("Failed to open SQLite: {e}")))?;

        let corpus = Self { pool };
        corpus.run_migrations().await?;
        info!("SQLite corpus opened at {path}");
        Ok(corpus)
    }

    async fn run_migrations(&self) -> Result<(), CorpusError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_chunks (
                id           TEXT PRIMARY KEY NOT NULL,
                document_id  TEXT NOT NULL,
                category     TEXT NOT NULL,
                text         TEXT NOT NULL,
                embedding    BLOB NOT NULL,
                tags         TEXT NOT NULL DEFAULT '[]',
                indexed_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CorpusError::Storage(format!("knowledge_chunks table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_document ON knowledge_chunks(document_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CorpusError::Storage(format!("document index: {e}")))?;

        debug!("SQLite corpus migrations complete");
        Ok(())
    }

    /// Insert or overwrite chunks in one transaction.
    pub async fn upsert(&self, chunks: &[KnowledgeChunk]) -> Result<(), CorpusError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CorpusError::Storage(e.to_string()))?;

        for chunk in chunks {
            let tags = serde_json::to_string(&chunk.tags)
                .map_err(|e| CorpusError::Storage(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO knowledge_chunks (id, document_id, category, text, embedding, tags, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    document_id = excluded.document_id,
                    category = excluded.category,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    tags = excluded.tags,
                    indexed_at = excluded.indexed_at
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.category.as_str())
            .bind(&chunk.text)
            .bind(embedding_to_blob(&chunk.embedding))
            .bind(tags)
            .bind(chunk.indexed_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| CorpusError::Storage(format!("insert {}: {e}", chunk.id)))?;
        }

        tx.commit()
            .await
            .map_err(|e| CorpusError::Storage(e.to_string()))
    }

    /// Read every chunk, ordered by id.
    pub async fn load_all(&self) -> Result<Vec<KnowledgeChunk>, CorpusError> {
        let rows = sqlx::query("SELECT * FROM knowledge_chunks ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CorpusError::Storage(format!("load chunks: {e}")))?;
        rows.iter().map(row_to_chunk).collect()
    }

    /// Remove every chunk of a document, for re-ingestion.
    pub async fn delete_document(&self, document_id: &str) -> Result<u64, CorpusError> {
        let result = sqlx::query("DELETE FROM knowledge_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CorpusError::Storage(e.to_string()))?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<usize, CorpusError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM knowledge_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CorpusError::Storage(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| CorpusError::Storage(e.to_string()))?;
        Ok(n as usize)
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeChunk, CorpusError> {
    let get = |col: &str| -> Result<String, CorpusError> {
        row.try_get::<String, _>(col)
            .map_err(|e| CorpusError::Storage(format!("{col} column: {e}")))
    };

    let id = get("id")?;
    let category_str = get("category")?;
    let category: ChunkCategory = serde_json::from_value(serde_json::Value::String(category_str))
        .map_err(|e| CorpusError::InvalidChunk {
            chunk_id: id.clone(),
            reason: format!("category: {e}"),
        })?;

    let tags: BTreeSet<String> = serde_json::from_str(&get("tags")?).unwrap_or_default();

    let indexed_at = chrono::DateTime::parse_from_rfc3339(&get("indexed_at")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CorpusError::InvalidChunk {
            chunk_id: id.clone(),
            reason: format!("indexed_at: {e}"),
        })?;

    let blob: Vec<u8> = row
        .try_get("embedding")
        .map_err(|e| CorpusError::Storage(format!("embedding column: {e}")))?;

    Ok(KnowledgeChunk {
        document_id: get("document_id")?,
        category,
        text: get("text")?,
        embedding: blob_to_embedding(&blob),
        tags,
        indexed_at,
        id,
    })
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
