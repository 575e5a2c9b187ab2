//! Text generation providers.
//!
//! A [`GenerationProvider`] turns a prompt into text and reports failures as
//! a classified [`GenerationError`]. Callers that must always produce
//! something for the user (the question and summary paths) go through
//! [`generate_text`], which renders the error inline as `"[LLM error: ...]"`.
//!
//! Providers:
//! - **`openai`** / **`huggingface`**: OpenAI-compatible `POST /chat/completions`.
//!   Hugging Face is reached through its router (`https://router.huggingface.co/v1`)
//!   with the `HF_API_KEY` token.
//! - **`ollama`**: `POST /api/chat` with streaming disabled.
//! - **`disabled`**: every call fails with [`GenerationError::Disabled`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;

/// System message sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful codebase explanation assistant.";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation provider is disabled")]
    Disabled,

    #[error("rate limited by {provider}")]
    RateLimited { provider: &'static str },

    #[error("{provider} rejected the request ({status}): {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} unavailable ({status}): {body}")]
    Unavailable {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no choices returned")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Bracketed form shown to users in place of an answer.
    pub fn inline(&self) -> String {
        format!("[LLM error: {}]", self)
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Unavailable { .. } | Self::Transport(_)
        )
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt` using at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;
}

/// Generate text, turning any provider failure into its inline form.
pub async fn generate_text(provider: &dyn GenerationProvider, prompt: &str, max_tokens: u32) -> String {
    match provider.generate(prompt, max_tokens).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(model = provider.model_name(), error = %e, "generation failed");
            e.inline()
        }
    }
}

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl GenerationProvider for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

// ============ OpenAI-compatible chat completions ============

pub struct ChatCompletionsProvider {
    label: &'static str,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl ChatCompletionsProvider {
    pub fn new(
        label: &'static str,
        base_url: &str,
        api_key: String,
        config: &GenerationConfig,
    ) -> Result<Self> {
        Ok(Self {
            label,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let response = check_status(self.label, response).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationProvider for ChatCompletionsProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        with_retry(self.label, self.max_retries, || self.send_once(prompt, max_tokens)).await
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            url: config
                .url
                .as_deref()
                .unwrap_or("http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": max_tokens,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await?;

        let response = check_status("Ollama", response).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        json.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        with_retry("Ollama", self.max_retries, || self.send_once(prompt, max_tokens)).await
    }
}

// ============ Shared plumbing ============

/// Map a non-success HTTP status onto the error taxonomy.
async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        Err(GenerationError::RateLimited { provider })
    } else if status.is_server_error() {
        Err(GenerationError::Unavailable {
            provider,
            status: status.as_u16(),
            body,
        })
    } else {
        Err(GenerationError::Rejected {
            provider,
            status: status.as_u16(),
            body,
        })
    }
}

async fn with_retry<F, Fut>(
    provider: &'static str,
    max_retries: u32,
    mut attempt_fn: F,
) -> Result<String, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, GenerationError>>,
{
    let mut attempt = 0;
    loop {
        match attempt_fn().await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(
                    provider,
                    attempt,
                    max_retries,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "retrying generation request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Create the [`GenerationProvider`] named by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown provider names or a missing API key.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => {
            let key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
            let url = config.url.as_deref().unwrap_or("https://api.openai.com/v1");
            Ok(Arc::new(ChatCompletionsProvider::new("OpenAI", url, key, config)?))
        }
        "huggingface" => {
            let key = std::env::var("HF_API_KEY")
                .map_err(|_| anyhow::anyhow!("HF_API_KEY environment variable not set"))?;
            let url = config
                .url
                .as_deref()
                .unwrap_or("https://router.huggingface.co/v1");
            Ok(Arc::new(ChatCompletionsProvider::new(
                "Hugging Face",
                url,
                key,
                config,
            )?))
        }
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    async fn spawn_mock(status: StatusCode, body: Value) -> String {
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(move |Json(_req): Json<Value>| {
                    let body = body.clone();
                    async move { (status, Json(body)) }
                }),
            )
            .route(
                "/api/chat",
                post(|Json(req): Json<Value>| async move {
                    let prompt = req["messages"][1]["content"].as_str().unwrap_or("").to_string();
                    Json(json!({ "message": { "role": "assistant", "content": format!("echo: {}", prompt) } }))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}", addr)
    }

    fn test_config(url: &str) -> GenerationConfig {
        GenerationConfig {
            provider: "openai".to_string(),
            url: Some(url.to_string()),
            max_retries: 0,
            timeout_secs: 5,
            ..GenerationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_chat_completions_success() {
        let base = spawn_mock(
            StatusCode::OK,
            json!({ "choices": [ { "message": { "role": "assistant", "content": "It starts in main.py" } } ] }),
        )
        .await;
        let url = format!("{}/v1", base);
        let provider =
            ChatCompletionsProvider::new("OpenAI", &url, "k".to_string(), &test_config(&url)).unwrap();
        let text = provider.generate("where does it start?", 100).await.unwrap();
        assert_eq!(text, "It starts in main.py");
    }

    #[tokio::test]
    async fn test_chat_completions_no_choices() {
        let base = spawn_mock(StatusCode::OK, json!({ "choices": [] })).await;
        let url = format!("{}/v1", base);
        let provider =
            ChatCompletionsProvider::new("OpenAI", &url, "k".to_string(), &test_config(&url)).unwrap();
        let err = provider.generate("q", 10).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
        assert_eq!(err.inline(), "[LLM error: no choices returned]");
    }

    #[tokio::test]
    async fn test_chat_completions_classifies_errors() {
        let base = spawn_mock(StatusCode::BAD_REQUEST, json!({ "error": "model not found" })).await;
        let url = format!("{}/v1", base);
        let provider =
            ChatCompletionsProvider::new("OpenAI", &url, "k".to_string(), &test_config(&url)).unwrap();
        let err = provider.generate("q", 10).await.unwrap_err();
        assert!(matches!(err, GenerationError::Rejected { status: 400, .. }));

        let base = spawn_mock(StatusCode::TOO_MANY_REQUESTS, json!({})).await;
        let url = format!("{}/v1", base);
        let provider =
            ChatCompletionsProvider::new("OpenAI", &url, "k".to_string(), &test_config(&url)).unwrap();
        let err = provider.generate("q", 10).await.unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_generate_text_renders_inline() {
        let base = spawn_mock(StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "down" })).await;
        let url = format!("{}/v1", base);
        let provider =
            ChatCompletionsProvider::new("OpenAI", &url, "k".to_string(), &test_config(&url)).unwrap();
        let text = generate_text(&provider, "q", 10).await;
        assert!(text.starts_with("[LLM error: OpenAI unavailable (503)"), "{}", text);
    }

    /// Chat endpoint that fails with each queued status once, then answers.
    async fn spawn_flaky(statuses: &[StatusCode]) -> (String, Arc<AtomicUsize>) {
        let queue = Arc::new(Mutex::new(statuses.iter().copied().collect::<VecDeque<_>>()));
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(_req): Json<Value>| {
                let queue = queue.clone();
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let status = queue.lock().unwrap().pop_front();
                    match status {
                        Some(status) => (status, Json(json!({ "error": "scripted failure" }))),
                        None => (
                            StatusCode::OK,
                            Json(json!({ "choices": [ { "message": { "content": "recovered" } } ] })),
                        ),
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{}/v1", addr), requests)
    }

    fn retrying_provider(url: &str, max_retries: u32) -> ChatCompletionsProvider {
        let config = GenerationConfig {
            max_retries,
            ..test_config(url)
        };
        ChatCompletionsProvider::new("OpenAI", url, "k".to_string(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_is_retried() {
        let (url, requests) = spawn_flaky(&[StatusCode::SERVICE_UNAVAILABLE]).await;
        let provider = retrying_provider(&url, 2);

        let text = provider.generate("q", 10).await.unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_is_not_retried() {
        let (url, requests) = spawn_flaky(&[StatusCode::BAD_REQUEST; 4]).await;
        let provider = retrying_provider(&url, 3);

        let err = provider.generate("q", 10).await.unwrap_err();

        assert!(matches!(err, GenerationError::Rejected { status: 400, .. }));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_are_bounded() {
        let (url, requests) = spawn_flaky(&[StatusCode::TOO_MANY_REQUESTS; 3]).await;
        let provider = retrying_provider(&url, 1);

        let err = provider.generate("q", 10).await.unwrap_err();

        assert!(matches!(err, GenerationError::RateLimited { .. }));
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ollama_chat() {
        let base = spawn_mock(StatusCode::OK, json!({})).await;
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            url: Some(base),
            model: "llama3".to_string(),
            max_retries: 0,
            ..GenerationConfig::default()
        };
        let provider = OllamaGenerator::new(&config).unwrap();
        assert_eq!(provider.generate("hello", 10).await.unwrap(), "echo: hello");
    }

    #[tokio::test]
    async fn test_disabled_generator() {
        let text = generate_text(&DisabledGenerator, "q", 10).await;
        assert_eq!(text, "[LLM error: generation provider is disabled]");
    }

    #[test]
    fn test_unknown_generator() {
        let config = GenerationConfig {
            provider: "bard".to_string(),
            ..GenerationConfig::default()
        };
        assert!(create_generator(&config).is_err());
    }
}
