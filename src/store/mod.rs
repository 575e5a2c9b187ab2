//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the named-collection API the indexing and
//! query orchestrators are written against. One collection holds one
//! repository's index; collection names come from
//! [`collection_name`](crate::index::collection_name).
//!
//! Backends:
//! - [`SqliteVectorStore`]: persistent, the default (`[store] backend = "sqlite"`).
//! - [`InMemoryVectorStore`]: process-lifetime, for tests and throwaway runs.
//!
//! Both rank by brute-force cosine similarity over every vector in the
//! collection, which is adequate for the size of a single repository.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{IndexEntry, QueryHit};

/// Name and size of a stored collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub entries: usize,
}

/// Named-collection vector store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`delete_collection`](VectorStore::delete_collection) | Drop a collection; no-op if absent |
/// | [`create_collection`](VectorStore::create_collection) | Create an empty collection; error if it exists |
/// | [`collection_exists`](VectorStore::collection_exists) | Check for a collection |
/// | [`upsert`](VectorStore::upsert) | Insert or replace entries by id |
/// | [`collection_dims`](VectorStore::collection_dims) | Vector width fixed by the first upsert |
/// | [`query`](VectorStore::query) | `k` nearest entries by cosine similarity |
/// | [`list_collections`](VectorStore::list_collections) | All collections with entry counts |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn delete_collection(&self, name: &str) -> Result<()>;

    async fn create_collection(&self, name: &str) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Insert or replace entries in an existing collection.
    ///
    /// Every vector in a collection has the same width. The first non-empty
    /// upsert fixes it; later batches of a different width are rejected.
    async fn upsert(&self, name: &str, entries: Vec<IndexEntry>) -> Result<()>;

    /// Width of the collection's vectors, or `None` before anything was stored.
    ///
    /// Errors if the collection does not exist.
    async fn collection_dims(&self, name: &str) -> Result<Option<usize>>;

    /// Return up to `k` entries ranked by descending cosine similarity.
    ///
    /// Errors if the collection does not exist.
    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;
}

/// Open the backend named by `[store].backend`.
pub async fn open_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    match config.store.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::open(config).await?)),
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        other => bail!("Unknown store backend: {}", other),
    }
}

/// Width shared by every vector in `entries`, checked against the width
/// already recorded for the collection.
///
/// Returns `None` for an empty batch.
pub(crate) fn batch_dims(
    name: &str,
    recorded: Option<usize>,
    entries: &[IndexEntry],
) -> Result<Option<usize>> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };
    let dims = first.embedding.len();
    if let Some(other) = entries.iter().find(|e| e.embedding.len() != dims) {
        bail!(
            "Embedding dimension mismatch in batch for {}: {} has {}, expected {}",
            name,
            other.id,
            other.embedding.len(),
            dims
        );
    }
    if let Some(recorded) = recorded {
        if recorded != dims {
            bail!(
                "Embedding dimension mismatch for {}: collection holds {}-dimensional vectors, got {}",
                name,
                recorded,
                dims
            );
        }
    }
    Ok(Some(dims))
}

/// Sort hits best-first and keep the top `k`.
pub(crate) fn rank(mut hits: Vec<QueryHit>, k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(k);
    hits
}
