//! Core data models used throughout repo-rag.
//!
//! These types represent the files, chunks, index entries, and chat
//! sessions that flow through the analysis and question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file found while walking a repository working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    /// Path relative to the repository root, `/`-separated.
    pub relative_path: String,
    pub full_path: String,
    /// Lower-cased extension including the dot (`".py"`), empty if none.
    pub extension: String,
}

/// A window of consecutive lines from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub repo_id: String,
    pub file_path: String,
    pub chunk_index: usize,
    pub text: String,
}

impl Chunk {
    /// Stable id of the chunk within its repository's index.
    pub fn id(&self) -> String {
        format!("{}::{}", self.file_path, self.chunk_index)
    }
}

/// Metadata stored next to every vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub chunk_index: usize,
}

/// One stored vector with its document text.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbour result from a collection.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query vector, higher is closer.
    pub score: f32,
}

/// One question and the answer it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub question: String,
    pub answer: String,
}

/// Everything known about an analyzed repository for the life of the process.
#[derive(Debug, Clone, Serialize)]
pub struct RepoSession {
    pub repo_url: String,
    pub files: Vec<RepoFile>,
    pub structure_summary: String,
    pub repo_structure: String,
    pub chat_history: Vec<ChatExchange>,
    pub analyzed_at: DateTime<Utc>,
}

impl RepoSession {
    pub fn new(
        repo_url: impl Into<String>,
        files: Vec<RepoFile>,
        structure_summary: String,
        repo_structure: String,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            files,
            structure_summary,
            repo_structure,
            chat_history: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }
}
