//! HTTP API over the analyze / ask workflow.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/repos` | Clone, index and summarize `{ "repo_url": ... }` |
//! | `GET`  | `/repos` | Analyzed repositories |
//! | `GET`  | `/repos/{id}` | Session detail: files, tree, summary, history |
//! | `POST` | `/repos/{id}/ask` | Answer `{ "question": ... }` |
//! | `GET`  | `/repos/{id}/history` | Chat history as JSON |
//! | `GET`  | `/repos/{id}/history/export` | Chat history as plain text |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, including malformed JSON bodies),
//! `not_found` (404), `analyze_failed` (502 when the clone fails, 500
//! otherwise).
//!
//! Asking about a repository that was never indexed is not an error: the
//! response is `200` with a fixed "not indexed" answer.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::assistant::{AnalysisReport, AnalyzeError, RepoAssistant};
use crate::config::Config;
use crate::models::{ChatExchange, RepoSession};
use crate::query::SourceRef;
use crate::session::SessionSummary;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    assistant: Arc<RepoAssistant>,
}

/// Build the assistant from `config` and serve on `[server].bind` until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let assistant = RepoAssistant::from_config(config.clone()).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    serve(Arc::new(assistant), listener).await
}

/// Serve the API for `assistant` on an already-bound listener.
pub async fn serve(
    assistant: Arc<RepoAssistant>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on http://{}", addr);
    }
    axum::serve(listener, router(assistant)).await?;
    Ok(())
}

/// The API routes with CORS applied.
pub fn router(assistant: Arc<RepoAssistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/repos", get(handle_list_repos).post(handle_analyze))
        .route("/repos/{id}", get(handle_get_repo))
        .route("/repos/{id}/ask", post(handle_ask))
        .route("/repos/{id}/history", get(handle_history))
        .route("/repos/{id}/history/export", get(handle_export))
        .layer(cors)
        .with_state(AppState { assistant })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(repo_id: &str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: format!("no analyzed repository with id: {}", repo_id),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<AnalyzeError> for AppError {
    fn from(err: AnalyzeError) -> Self {
        let status = match err {
            AnalyzeError::EmptyUrl | AnalyzeError::InvalidUrl(_) => {
                return bad_request(err.to_string())
            }
            AnalyzeError::Clone(_) => StatusCode::BAD_GATEWAY,
            AnalyzeError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: "analyze_failed",
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /repos ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    repo_url: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, AppError> {
    let Json(req) = body?;
    match state.assistant.analyze(&req.repo_url).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            tracing::error!(url = %req.repo_url, error = %e, "analysis failed");
            Err(e.into())
        }
    }
}

#[derive(Serialize)]
struct RepoListResponse {
    repos: Vec<SessionSummary>,
}

async fn handle_list_repos(State(state): State<AppState>) -> Json<RepoListResponse> {
    Json(RepoListResponse {
        repos: state.assistant.sessions().list().await,
    })
}

#[derive(Serialize)]
struct RepoDetailResponse {
    repo_id: String,
    #[serde(flatten)]
    session: RepoSession,
}

async fn handle_get_repo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RepoDetailResponse>, AppError> {
    let session = state
        .assistant
        .sessions()
        .get(&id)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(RepoDetailResponse {
        repo_id: id,
        session,
    }))
}

// ============ POST /repos/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    repo_id: String,
    question: String,
    answer: String,
    sources: Vec<SourceRef>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = body?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let answer = state.assistant.ask(&id, question).await;
    Ok(Json(AskResponse {
        repo_id: id,
        question: question.to_string(),
        answer: answer.text,
        sources: answer.sources,
    }))
}

// ============ history ============

#[derive(Serialize)]
struct HistoryResponse {
    repo_id: String,
    history: Vec<ChatExchange>,
}

async fn handle_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = state
        .assistant
        .sessions()
        .history(&id)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(HistoryResponse {
        repo_id: id,
        history,
    }))
}

async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let text = state
        .assistant
        .sessions()
        .export_history(&id)
        .await
        .ok_or_else(|| not_found(&id))?;

    let disposition = format!("attachment; filename=\"chat_history_{}.txt\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    )
        .into_response())
}
