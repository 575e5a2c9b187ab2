//! The analyze / ask workflow shared by the HTTP server and the CLI.
//!
//! A [`RepoAssistant`] owns the vector store, both providers and the session
//! store. [`RepoAssistant::analyze`] clones a repository, indexes it and
//! records a session; [`RepoAssistant::ask`] answers a question against that
//! index and appends the exchange to the session's history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::collector::{list_repo_files, repo_structure, CollectOptions};
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::generation::{create_generator, GenerationProvider};
use crate::index::{build_index, IndexOptions};
use crate::models::RepoSession;
use crate::query::{answer_question, Answer};
use crate::repo_source::{clone_repo, looks_like_url, remove_working_copy, repo_id};
use crate::session::SessionStore;
use crate::store::{open_store, VectorStore};
use crate::summarize::summarize_structure;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("repository URL must not be empty")]
    EmptyUrl,

    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("clone failed: {0:#}")]
    Clone(anyhow::Error),

    #[error("analysis failed: {0:#}")]
    Pipeline(anyhow::Error),
}

/// Result of analyzing one repository.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub repo_id: String,
    pub repo_url: String,
    pub collection: String,
    pub files: usize,
    pub chunks: usize,
    pub skipped: Vec<String>,
    pub structure_summary: String,
    pub repo_structure: String,
}

pub struct RepoAssistant {
    config: Config,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    sessions: SessionStore,
}

impl RepoAssistant {
    pub fn new(
        config: Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
            generator,
            sessions: SessionStore::new(),
        }
    }

    /// Open the configured store and build both providers.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = open_store(&config).await?;
        let embedder = create_provider(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Ok(Self::new(config, store, embedder, generator))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Map a CLI/HTTP repository argument to an id: URLs are hashed, ids pass through.
    pub fn resolve_repo_id(repo: &str) -> String {
        if looks_like_url(repo) {
            repo_id(repo)
        } else {
            repo.trim().to_string()
        }
    }

    /// Clone `repo_url`, index it and record a fresh session.
    pub async fn analyze(&self, repo_url: &str) -> Result<AnalysisReport, AnalyzeError> {
        let repo_url = repo_url.trim().to_string();
        if repo_url.is_empty() {
            return Err(AnalyzeError::EmptyUrl);
        }
        if repo_url.starts_with('-') {
            return Err(AnalyzeError::InvalidUrl(repo_url));
        }

        let cache_dir = self.config.repos.cache_dir.clone();
        let url = repo_url.clone();
        let root = tokio::task::spawn_blocking(move || clone_repo(&url, &cache_dir))
            .await
            .map_err(|e| AnalyzeError::Clone(e.into()))?
            .map_err(AnalyzeError::Clone)?;

        let result = self
            .analyze_working_copy(&repo_url, &root)
            .await
            .map_err(AnalyzeError::Pipeline);

        if !self.config.repos.keep_clones {
            if let Err(e) = remove_working_copy(&root) {
                tracing::warn!(path = %root.display(), error = %e, "failed to remove working copy");
            }
        }

        result
    }

    /// Index an existing working copy at `root` as if it had been cloned from `repo_url`.
    pub async fn analyze_working_copy(&self, repo_url: &str, root: &Path) -> Result<AnalysisReport> {
        let id = repo_id(repo_url);
        let options = CollectOptions::from_config(&self.config.repos);
        let walk_root: PathBuf = root.to_path_buf();

        let (files, tree) = tokio::task::spawn_blocking(move || {
            let files = list_repo_files(&walk_root, &options)?;
            let tree = repo_structure(&walk_root);
            Ok::<_, anyhow::Error>((files, tree))
        })
        .await
        .context("File collection task panicked")??;

        tracing::info!(repo_id = %id, files = files.len(), "collected files");

        let index = build_index(
            self.store.as_ref(),
            self.embedder.as_ref(),
            &id,
            &files,
            &IndexOptions::from_config(&self.config),
        )
        .await
        .with_context(|| format!("Failed to index {}", repo_url))?;

        let summary = summarize_structure(
            self.generator.as_ref(),
            &files,
            self.config.retrieval.summary_max_files,
            self.config.generation.summary_max_tokens,
        )
        .await;

        let report = AnalysisReport {
            repo_id: id.clone(),
            repo_url: repo_url.to_string(),
            collection: index.collection,
            files: index.files,
            chunks: index.chunks,
            skipped: index.skipped,
            structure_summary: summary.clone(),
            repo_structure: tree.clone(),
        };

        self.sessions
            .insert(&id, RepoSession::new(repo_url, files, summary, tree))
            .await;

        Ok(report)
    }

    /// Answer `question` for `repo_id` and record the exchange if a session exists.
    pub async fn ask(&self, repo_id: &str, question: &str) -> Answer {
        let answer = answer_question(
            self.store.as_ref(),
            self.embedder.as_ref(),
            self.generator.as_ref(),
            repo_id,
            question,
            self.config.retrieval.top_k,
            self.config.generation.max_tokens,
        )
        .await;

        self.sessions
            .append_exchange(repo_id, question, &answer.text)
            .await;

        answer
    }
}
