//! Process-lifetime session state, keyed by repository id.
//!
//! The map sits behind a `RwLock`; each session has its own `Mutex`, so
//! appends to one repository's history are serialized without blocking
//! readers of other repositories. Nothing here survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::models::{ChatExchange, RepoSession};

/// Listing row for an analyzed repository.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub repo_id: String,
    pub repo_url: String,
    pub files: usize,
    pub exchanges: usize,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<RepoSession>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the session for `repo_id`. Re-analysis starts a fresh history.
    pub async fn insert(&self, repo_id: &str, session: RepoSession) {
        self.sessions
            .write()
            .await
            .insert(repo_id.to_string(), Arc::new(Mutex::new(session)));
    }

    async fn entry(&self, repo_id: &str) -> Option<Arc<Mutex<RepoSession>>> {
        self.sessions.read().await.get(repo_id).cloned()
    }

    /// Snapshot of the session for `repo_id`.
    pub async fn get(&self, repo_id: &str) -> Option<RepoSession> {
        let entry = self.entry(repo_id).await?;
        let session = entry.lock().await;
        Some(session.clone())
    }

    pub async fn contains(&self, repo_id: &str) -> bool {
        self.sessions.read().await.contains_key(repo_id)
    }

    /// All sessions, most recently analyzed first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let entries: Vec<(String, Arc<Mutex<RepoSession>>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();

        let mut out = Vec::with_capacity(entries.len());
        for (repo_id, entry) in entries {
            let session = entry.lock().await;
            out.push(SessionSummary {
                repo_id,
                repo_url: session.repo_url.clone(),
                files: session.files.len(),
                exchanges: session.chat_history.len(),
                analyzed_at: session.analyzed_at,
            });
        }
        out.sort_by(|a, b| {
            b.analyzed_at
                .cmp(&a.analyzed_at)
                .then_with(|| a.repo_id.cmp(&b.repo_id))
        });
        out
    }

    /// Append an exchange; returns `false` if there is no session for `repo_id`.
    pub async fn append_exchange(&self, repo_id: &str, question: &str, answer: &str) -> bool {
        let Some(entry) = self.entry(repo_id).await else {
            return false;
        };
        entry.lock().await.chat_history.push(ChatExchange {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        true
    }

    pub async fn history(&self, repo_id: &str) -> Option<Vec<ChatExchange>> {
        let entry = self.entry(repo_id).await?;
        let session = entry.lock().await;
        Some(session.chat_history.clone())
    }

    /// Plain-text export of the history for `repo_id`.
    pub async fn export_history(&self, repo_id: &str) -> Option<String> {
        let entry = self.entry(repo_id).await?;
        let session = entry.lock().await;
        Some(export_history(&session))
    }
}

/// Render a session's chat history as numbered `Q<n>:` / `A<n>:` pairs.
pub fn export_history(session: &RepoSession) -> String {
    let mut out = format!("Repository: {}\n\n", session.repo_url);
    for (i, exchange) in session.chat_history.iter().enumerate() {
        let n = i + 1;
        out.push_str(&format!("Q{}: {}\n", n, exchange.question));
        out.push_str(&format!("A{}: {}\n\n", n, exchange.answer));
    }
    out
}
