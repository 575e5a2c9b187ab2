//! Index build: files → chunks → embeddings → collection.
//!
//! [`build_index`] always starts from an empty collection. The previous
//! collection for the repository is dropped first, so an index never mixes
//! chunks from two builds. Two concurrent builds for the same repository can
//! still interleave their delete/create steps; nothing here serializes them.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::chunk::{chunk_file, decode_lossy};
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::models::{ChunkMetadata, IndexEntry, RepoFile};
use crate::store::VectorStore;

/// Collection holding the index for `repo_id`.
pub fn collection_name(repo_id: &str) -> String {
    format!("repo_{}", repo_id)
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub window_lines: usize,
    /// Skip unreadable files with a warning instead of aborting the build.
    pub skip_unreadable: bool,
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window_lines: config.chunking.window_lines,
            skip_unreadable: config.indexing.skip_unreadable,
        }
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            window_lines: crate::chunk::DEFAULT_WINDOW_LINES,
            skip_unreadable: false,
        }
    }
}

/// Outcome of an index build.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub collection: String,
    pub files: usize,
    pub chunks: usize,
    /// Relative paths of files that could not be read (only with `skip_unreadable`).
    pub skipped: Vec<String>,
}

/// Build (or rebuild) the index for `repo_id` from `files`.
///
/// # Errors
///
/// Fails if the store or embedding provider fails, or, unless
/// `skip_unreadable` is set, if any file cannot be read.
pub async fn build_index(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    repo_id: &str,
    files: &[RepoFile],
    options: &IndexOptions,
) -> Result<IndexReport> {
    let collection = collection_name(repo_id);

    store.delete_collection(&collection).await?;
    store.create_collection(&collection).await?;

    let mut ids = Vec::new();
    let mut documents = Vec::new();
    let mut metadatas = Vec::new();
    let mut skipped = Vec::new();

    for file in files {
        let bytes = match tokio::fs::read(&file.full_path).await {
            Ok(bytes) => bytes,
            Err(e) if options.skip_unreadable => {
                tracing::warn!(file = %file.relative_path, error = %e, "skipping unreadable file");
                skipped.push(file.relative_path.clone());
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", file.relative_path));
            }
        };

        let text = decode_lossy(&bytes);
        for chunk in chunk_file(repo_id, &file.relative_path, &text, options.window_lines) {
            ids.push(chunk.id());
            metadatas.push(ChunkMetadata {
                file_path: chunk.file_path,
                chunk_index: chunk.chunk_index,
            });
            documents.push(chunk.text);
        }
    }

    let report = IndexReport {
        collection: collection.clone(),
        files: files.len() - skipped.len(),
        chunks: documents.len(),
        skipped,
    };

    if documents.is_empty() {
        tracing::info!(collection = %collection, "no chunks to index");
        return Ok(report);
    }

    let embeddings = embedder
        .embed(&documents)
        .await
        .with_context(|| format!("Failed to embed {} chunks", documents.len()))?;

    if embeddings.len() != documents.len() {
        bail!(
            "Embedding provider returned {} vectors for {} chunks",
            embeddings.len(),
            documents.len()
        );
    }

    let entries: Vec<IndexEntry> = ids
        .into_iter()
        .zip(embeddings)
        .zip(documents)
        .zip(metadatas)
        .map(|(((id, embedding), document), metadata)| IndexEntry {
            id,
            embedding,
            document,
            metadata,
        })
        .collect();

    store.upsert(&collection, entries).await?;

    tracing::info!(
        collection = %collection,
        files = report.files,
        chunks = report.chunks,
        model = embedder.model_name(),
        "index built"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::store::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts embed calls and delegates to a hash embedder.
    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::new(256),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            256
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(texts).await
        }
    }

    fn write_file(root: &std::path::Path, rel: &str, content: &str) -> RepoFile {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        RepoFile {
            relative_path: rel.to_string(),
            full_path: path.to_string_lossy().to_string(),
            extension: ".py".to_string(),
        }
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(collection_name("0123abcd4567"), "repo_0123abcd4567");
    }

    #[tokio::test]
    async fn test_empty_repository_skips_embedding() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryVectorStore::new();
        let embedder = CountingEmbedder::new();
        let empty = write_file(tmp.path(), "empty.py", "");

        let report = build_index(&store, &embedder, "r1", &[empty], &IndexOptions::default())
            .await
            .unwrap();

        assert_eq!(report.chunks, 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(store.collection_exists("repo_r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_single_batch_embedding() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryVectorStore::new();
        let embedder = CountingEmbedder::new();
        let body: String = (0..300).map(|i| format!("x = {}\n", i)).collect();
        let files = vec![
            write_file(tmp.path(), "a.py", &body),
            write_file(tmp.path(), "pkg/b.py", "import os\n"),
        ];

        let report = build_index(&store, &embedder, "r2", &files, &IndexOptions::default())
            .await
            .unwrap();

        assert_eq!(report.chunks, 4);
        assert_eq!(report.files, 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        let infos = store.list_collections().await.unwrap();
        assert_eq!(infos[0].entries, 4);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_dropped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bin.py");
        fs::write(&path, b"ok = 1\n\xff\xfe\nalso_ok = 2\n").unwrap();
        let file = RepoFile {
            relative_path: "bin.py".to_string(),
            full_path: path.to_string_lossy().to_string(),
            extension: ".py".to_string(),
        };
        let store = InMemoryVectorStore::new();
        let embedder = HashEmbedder::new(64);

        let report = build_index(&store, &embedder, "r3", &[file], &IndexOptions::default())
            .await
            .unwrap();
        assert_eq!(report.chunks, 1);

        let hits = store.query("repo_r3", &embedder.embed_one("ok"), 1).await.unwrap();
        assert_eq!(hits[0].document, "ok = 1\n\nalso_ok = 2");
    }

    #[tokio::test]
    async fn test_unreadable_file_aborts_by_default() {
        let tmp = TempDir::new().unwrap();
        let good = write_file(tmp.path(), "good.py", "print(1)\n");
        let missing = RepoFile {
            relative_path: "gone.py".to_string(),
            full_path: tmp.path().join("gone.py").to_string_lossy().to_string(),
            extension: ".py".to_string(),
        };
        let store = InMemoryVectorStore::new();
        let embedder = CountingEmbedder::new();

        let err = build_index(&store, &embedder, "r4", &[good, missing], &IndexOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gone.py"));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_skipped_when_configured() {
        let tmp = TempDir::new().unwrap();
        let good = write_file(tmp.path(), "good.py", "print(1)\n");
        let missing = RepoFile {
            relative_path: "gone.py".to_string(),
            full_path: tmp.path().join("gone.py").to_string_lossy().to_string(),
            extension: ".py".to_string(),
        };
        let store = InMemoryVectorStore::new();
        let embedder = CountingEmbedder::new();
        let options = IndexOptions {
            skip_unreadable: true,
            ..IndexOptions::default()
        };

        let report = build_index(&store, &embedder, "r5", &[good, missing], &options)
            .await
            .unwrap();
        assert_eq!(report.skipped, vec!["gone.py".to_string()]);
        assert_eq!(report.files, 1);
        assert_eq!(report.chunks, 1);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_chunks() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryVectorStore::new();
        let embedder = HashEmbedder::new(64);

        let old = write_file(tmp.path(), "old.py", "legacy = True\n");
        build_index(&store, &embedder, "r6", &[old], &IndexOptions::default())
            .await
            .unwrap();

        let new = write_file(tmp.path(), "new.py", "fresh = True\n");
        build_index(&store, &embedder, "r6", &[new], &IndexOptions::default())
            .await
            .unwrap();

        let infos = store.list_collections().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].entries, 1);
        let hits = store.query("repo_r6", &embedder.embed_one("legacy"), 6).await.unwrap();
        assert!(hits.iter().all(|h| h.metadata.file_path == "new.py"));
    }
}
