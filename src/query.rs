//! Question answering over an indexed repository.
//!
//! [`answer_question`] is the whole retrieval-augmented path: embed the
//! question, pull the nearest chunks from the repository's collection, build
//! a grounded prompt and hand it to the generation provider. It never
//! returns an error. Missing indexes, retrieval failures and provider
//! failures all come back as answer text the user can read.

use serde::Serialize;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::generation::{generate_text, GenerationProvider};
use crate::index::collection_name;
use crate::models::QueryHit;
use crate::store::VectorStore;

/// Answer for a repository that has never been indexed.
pub const NO_INDEX_MESSAGE: &str =
    "This repository has not been indexed yet. Analyze it before asking questions.";

/// Answer when retrieval comes back empty.
pub const NO_CONTEXT_MESSAGE: &str = "I could not find any context for this repository.";

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no index for collection {0}")]
    NoIndex(String),

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("index holds {indexed}-dimensional vectors but the question embedding has {query}")]
    DimensionMismatch { indexed: usize, query: usize },

    #[error("vector store failed: {0:#}")]
    Store(anyhow::Error),
}

impl QueryError {
    /// Text returned to the user in place of an answer.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoIndex(_) => NO_INDEX_MESSAGE.to_string(),
            Self::DimensionMismatch { .. } => format!(
                "[Retrieval error: {}. The embedding model changed since this repository was \
                 indexed; re-analyze it to rebuild the index.]",
                self
            ),
            other => format!("[Retrieval error: {}]", other),
        }
    }
}

/// A retrieved chunk that fed into an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub file_path: String,
    pub chunk_index: usize,
    pub score: f32,
}

impl From<&QueryHit> for SourceRef {
    fn from(hit: &QueryHit) -> Self {
        Self {
            file_path: hit.metadata.file_path.clone(),
            chunk_index: hit.metadata.chunk_index,
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

impl Answer {
    fn without_sources(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Render hits as the context block of the prompt.
pub fn format_context(hits: &[QueryHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "File: {} (chunk {})\n{}",
                h.metadata.file_path, h.metadata.chunk_index, h.document
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a codebase assistant for students.\n\
         Use only the context from the repository below to answer the question.\n\
         If the answer is not in the context, say you do not know.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Answer clearly and mention file paths when helpful.\n"
    )
}

/// Embed `question` and fetch the `top_k` nearest chunks for `repo_id`.
pub async fn retrieve(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    repo_id: &str,
    question: &str,
    top_k: usize,
) -> Result<Vec<QueryHit>, QueryError> {
    let collection = collection_name(repo_id);

    if !store
        .collection_exists(&collection)
        .await
        .map_err(QueryError::Store)?
    {
        return Err(QueryError::NoIndex(collection));
    }

    let embedding = embed_query(embedder, question)
        .await
        .map_err(QueryError::Embedding)?;

    let indexed = store
        .collection_dims(&collection)
        .await
        .map_err(QueryError::Store)?;
    if let Some(indexed) = indexed {
        if indexed != embedding.len() {
            return Err(QueryError::DimensionMismatch {
                indexed,
                query: embedding.len(),
            });
        }
    }

    store
        .query(&collection, &embedding, top_k)
        .await
        .map_err(QueryError::Store)
}

/// Answer `question` from the indexed contents of `repo_id`.
pub async fn answer_question(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    generator: &dyn GenerationProvider,
    repo_id: &str,
    question: &str,
    top_k: usize,
    max_tokens: u32,
) -> Answer {
    let hits = match retrieve(store, embedder, repo_id, question, top_k).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(repo_id, error = %e, "retrieval failed");
            return Answer::without_sources(e.user_message());
        }
    };

    if hits.is_empty() {
        return Answer::without_sources(NO_CONTEXT_MESSAGE);
    }

    tracing::debug!(repo_id, hits = hits.len(), "retrieved context");

    let prompt = build_prompt(&format_context(&hits), question);
    let text = generate_text(generator, &prompt, max_tokens).await;

    Answer {
        text,
        sources: hits.iter().map(SourceRef::from).collect(),
    }
}
