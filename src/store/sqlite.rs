//! SQLite-backed [`VectorStore`] implementation.
//!
//! Collections are rows in `collections`; vectors live in `entries` as
//! little-endian `f32` BLOBs (see [`vec_to_blob`]) next to their `dims`.
//! Queries load every vector of the collection and rank them with cosine
//! similarity in Rust.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{ChunkMetadata, IndexEntry, QueryHit};

use super::{batch_dims, rank, CollectionInfo, VectorStore};

/// Open (creating if needed) the index database at `path` in WAL mode.
pub(crate) async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database: {}", path.display()))
}

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = connect(&config.db.path).await?;
        migrate::apply(&pool).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn stored_dims<'e, E>(executor: E, name: &str) -> Result<Option<usize>>
    where
        E: sqlx::SqliteExecutor<'e>,
    {
        let dims: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM entries WHERE collection = ? LIMIT 1")
                .bind(name)
                .fetch_optional(executor)
                .await?;
        Ok(dims.map(|d| d.max(0) as usize))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            bail!("Collection already exists: {}", name);
        }

        sqlx::query("INSERT INTO collections (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn upsert(&self, name: &str, entries: Vec<IndexEntry>) -> Result<()> {
        if !self.collection_exists(name).await? {
            bail!("Collection not found: {}", name);
        }

        let mut tx = self.pool.begin().await?;

        let recorded = Self::stored_dims(&mut *tx, name).await?;
        batch_dims(name, recorded, &entries)?;

        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, document, file_path, chunk_index, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    file_path = excluded.file_path,
                    chunk_index = excluded.chunk_index,
                    dims = excluded.dims,
                    embedding = excluded.embedding
                "#,
            )
            .bind(name)
            .bind(&entry.id)
            .bind(&entry.document)
            .bind(&entry.metadata.file_path)
            .bind(entry.metadata.chunk_index as i64)
            .bind(entry.embedding.len() as i64)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn collection_dims(&self, name: &str) -> Result<Option<usize>> {
        if !self.collection_exists(name).await? {
            bail!("Collection not found: {}", name);
        }
        Self::stored_dims(&self.pool, name).await
    }

    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        if !self.collection_exists(name).await? {
            bail!("Collection not found: {}", name);
        }

        let rows = sqlx::query(
            "SELECT id, document, file_path, chunk_index, embedding FROM entries WHERE collection = ?",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let chunk_index: i64 = row.get("chunk_index");
                QueryHit {
                    id: row.get("id"),
                    document: row.get("document"),
                    metadata: ChunkMetadata {
                        file_path: row.get("file_path"),
                        chunk_index: chunk_index.max(0) as usize,
                    },
                    score: cosine_similarity(embedding, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank(hits, k))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS name, COUNT(e.id) AS entries
            FROM collections c
            LEFT JOIN entries e ON e.collection = c.name
            GROUP BY c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let entries: i64 = row.get("entries");
                CollectionInfo {
                    name: row.get("name"),
                    entries: entries.max(0) as usize,
                }
            })
            .collect())
    }
}
