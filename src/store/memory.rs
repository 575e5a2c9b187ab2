//! In-memory [`VectorStore`] implementation for tests and throwaway runs.
//!
//! Collections live in a `HashMap` behind a `tokio::sync::RwLock`; entries
//! are keyed by id so upserts replace in place. A collection's vector width
//! is fixed by its first non-empty upsert.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::embedding::cosine_similarity;
use crate::models::{IndexEntry, QueryHit};

use super::{batch_dims, rank, CollectionInfo, VectorStore};

#[derive(Default)]
struct Collection {
    dims: Option<usize>,
    entries: BTreeMap<String, IndexEntry>,
}

/// In-memory store; contents vanish with the process.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            bail!("Collection already exists: {}", name);
        }
        collections.insert(name.to_string(), Collection::default());
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn upsert(&self, name: &str, entries: Vec<IndexEntry>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(name) else {
            bail!("Collection not found: {}", name);
        };
        if let Some(dims) = batch_dims(name, collection.dims, &entries)? {
            collection.dims = Some(dims);
        }
        for entry in entries {
            collection.entries.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn collection_dims(&self, name: &str) -> Result<Option<usize>> {
        match self.collections.read().await.get(name) {
            Some(collection) => Ok(collection.dims),
            None => bail!("Collection not found: {}", name),
        }
    }

    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(name) else {
            bail!("Collection not found: {}", name);
        };
        let hits = collection
            .entries
            .values()
            .map(|e| QueryHit {
                id: e.id.clone(),
                document: e.document.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(embedding, &e.embedding),
            })
            .collect();
        Ok(rank(hits, k))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read().await;
        let mut infos: Vec<CollectionInfo> = collections
            .iter()
            .map(|(name, collection)| CollectionInfo {
                name: name.clone(),
                entries: collection.entries.len(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }
}
