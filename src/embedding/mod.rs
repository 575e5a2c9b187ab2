//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]**: returns errors; used when embeddings are not configured.
//! - **[`OpenAIProvider`]**: calls an OpenAI-compatible `/embeddings` endpoint.
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`HuggingFaceProvider`]**: calls the Hugging Face feature-extraction pipeline.
//! - **[`HashEmbedder`]**: deterministic feature-hashed bag of words; offline, no model.
//! - **`LocalProvider`**: fastembed in-process inference (`local-embeddings` feature).
//!
//! Also provides vector utilities used by the stores:
//! - [`cosine_similarity`]: similarity between two embedding vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` BLOB encoding for SQLite
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the provider named in the config:
//!
//! ```rust,no_run
//! # use repo_rag::config::EmbeddingConfig;
//! # use repo_rag::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! The HTTP providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Every provider splits its input into `batch_size` requests internally and
//! returns vectors in input order, so callers can hand over a whole
//! repository's chunks in one call.

mod hashed;
#[cfg(feature = "local-embeddings")]
mod local;

pub use hashed::HashEmbedder;
#[cfg(feature = "local-embeddings")]
pub use local::LocalProvider;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Trait for embedding providers.
///
/// The same provider must be used for document chunks and questions so
/// that their vectors are comparable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = provider.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.")
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API (or any compatible server).
///
/// Calls `POST {url}/embeddings`, defaulting to `https://api.openai.com/v1`.
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            base_url: trim_base(config.url.as_deref().unwrap_or("https://api.openai.com/v1")),
            model,
            dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_with_retry("OpenAI", self.max_retries, || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;
            out.extend(parse_openai_response(&json)?);
        }
        Ok(out)
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays and orders them by `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, json_to_vec(embedding)?));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
/// Requires an embedding model to be pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: trim_base(config.url.as_deref().unwrap_or("http://localhost:11434")),
            model,
            dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.url);
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_with_retry("Ollama", self.max_retries, || {
                self.client.post(&url).json(&body)
            })
            .await
            .map_err(|e| {
                anyhow::anyhow!("{} (is Ollama running at {}?)", e, self.url)
            })?;
            out.extend(parse_ollama_response(&json)?);
        }
        Ok(out)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings.iter().map(json_to_vec).collect()
}

// ============ Hugging Face Provider ============

/// Embedding provider using the Hugging Face inference feature-extraction pipeline.
///
/// Calls `POST {url}/{model}/pipeline/feature-extraction` with the `HF_API_KEY`
/// token. The default URL is the hosted router.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl HuggingFaceProvider {
    /// Create a provider using the `HF_API_KEY` token from the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("HF_API_KEY")
            .map_err(|_| anyhow::anyhow!("HF_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Hugging Face provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Hugging Face provider"))?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            base_url: trim_base(
                config
                    .url
                    .as_deref()
                    .unwrap_or("https://router.huggingface.co/hf-inference/models"),
            ),
            model,
            dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model);
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({ "inputs": batch });
            let json = post_with_retry("Hugging Face", self.max_retries, || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;
            out.extend(parse_feature_extraction(&json, batch.len())?);
        }
        Ok(out)
    }
}

/// Parse a feature-extraction response.
///
/// The pipeline returns one entry per input; an entry is either a flat
/// vector or a nested `[[...]]`, in which case the first row is used. A
/// single input may also come back as a bare flat vector.
fn parse_feature_extraction(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let items = json
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid Hugging Face response: expected an array"))?;

    if expected == 1 && items.first().is_some_and(|v| v.is_number()) {
        return Ok(vec![json_to_vec(json)?]);
    }

    items
        .iter()
        .map(|item| match item.as_array().and_then(|a| a.first()) {
            Some(first) if first.is_array() => json_to_vec(first),
            _ => json_to_vec(item),
        })
        .collect()
}

// ============ Shared HTTP plumbing ============

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn json_to_vec(value: &serde_json::Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: embedding is not an array"))?;
    Ok(arr
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// POST a JSON request with exponential backoff on 429/5xx and network errors.
async fn post_with_retry<F>(label: &str, max_retries: u32, build: F) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(
                provider = label,
                attempt,
                max_retries,
                delay_secs = delay.as_secs(),
                "retrying embedding request"
            );
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        label,
                        status,
                        body_text
                    ));
                    continue;
                }

                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!("{} connection error: {}", label, e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} embedding failed after retries", label)))
}

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"huggingface"` | [`HuggingFaceProvider`] |
/// | `"hash"` | [`HashEmbedder`] |
/// | `"local"` | `LocalProvider` (requires the `local-embeddings` feature) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        "huggingface" => Ok(Arc::new(HuggingFaceProvider::new(config)?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(
            config.dims.unwrap_or(hashed::DEFAULT_DIMS),
        ))),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use repo_rag::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or
/// vectors of different lengths.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Feature-extraction endpoint that answers with queued statuses first,
    /// then embeds each input as `[len, 1.0]`.
    #[derive(Default)]
    struct MockPipeline {
        statuses: Mutex<VecDeque<StatusCode>>,
        requests: AtomicUsize,
    }

    async fn spawn_pipeline(statuses: &[StatusCode]) -> (String, Arc<MockPipeline>) {
        let mock = Arc::new(MockPipeline {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            requests: AtomicUsize::new(0),
        });
        let state = mock.clone();
        let app = Router::new().route(
            "/models/org/mini/pipeline/feature-extraction",
            post(move |Json(req): Json<Value>| {
                let mock = state.clone();
                async move {
                    mock.requests.fetch_add(1, Ordering::SeqCst);
                    let status = mock.statuses.lock().unwrap().pop_front();
                    if let Some(status) = status {
                        return (status, Json(json!({ "error": "scripted failure" })));
                    }
                    let rows: Vec<Value> = req["inputs"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|t| json!([[t.as_str().unwrap().len() as f64, 1.0]]))
                        .collect();
                    (StatusCode::OK, Json(Value::Array(rows)))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{}/models", addr), mock)
    }

    fn hf_provider(base: &str, batch_size: usize, max_retries: u32) -> HuggingFaceProvider {
        let config = EmbeddingConfig {
            provider: "huggingface".to_string(),
            model: Some("org/mini".to_string()),
            dims: Some(2),
            url: Some(base.to_string()),
            batch_size,
            max_retries,
            timeout_secs: 5,
        };
        HuggingFaceProvider::with_api_key(&config, "hf_test".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_huggingface_embed_batches_in_order() {
        let (base, mock) = spawn_pipeline(&[]).await;
        let provider = hf_provider(&base, 2, 0);
        let texts: Vec<String> = ["a", "bbb", "cc"].iter().map(|s| s.to_string()).collect();

        let vecs = provider.embed(&texts).await.unwrap();

        assert_eq!(vecs, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);
        assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (base, mock) = spawn_pipeline(&[StatusCode::SERVICE_UNAVAILABLE]).await;
        let provider = hf_provider(&base, 8, 2);

        let vecs = provider.embed(&["fn main".to_string()]).await.unwrap();

        assert_eq!(vecs, vec![vec![7.0, 1.0]]);
        assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let (base, mock) = spawn_pipeline(&[StatusCode::BAD_REQUEST; 4]).await;
        let provider = hf_provider(&base, 8, 3);

        let err = provider.embed(&["x".to_string()]).await.unwrap_err();

        assert!(err.to_string().contains("400"), "{}", err);
        assert_eq!(mock.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted_on_rate_limit() {
        let (base, mock) = spawn_pipeline(&[StatusCode::TOO_MANY_REQUESTS; 3]).await;
        let provider = hf_provider(&base, 8, 1);

        let err = provider.embed(&["x".to_string()]).await.unwrap_err();

        assert!(err.to_string().contains("429"), "{}", err);
        assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        assert!(parse_openai_response(&json!({ "error": "nope" })).is_err());
    }

    #[test]
    fn test_parse_ollama() {
        let json = json!({ "embeddings": [[0.5, 0.25], [1.0, 2.0]] });
        let vecs = parse_ollama_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![1.0, 2.0]);
    }

    #[test]
    fn test_parse_feature_extraction_shapes() {
        let flat_batch = json!([[0.1, 0.2], [0.3, 0.4]]);
        assert_eq!(parse_feature_extraction(&flat_batch, 2).unwrap().len(), 2);

        let nested = json!([[[0.1, 0.2]], [[0.3, 0.4]]]);
        let vecs = parse_feature_extraction(&nested, 2).unwrap();
        assert_eq!(vecs[1], vec![0.3, 0.4]);

        let single = json!([0.5, 0.5, 0.5]);
        let vecs = parse_feature_extraction(&single, 1).unwrap();
        assert_eq!(vecs, vec![vec![0.5, 0.5, 0.5]]);
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let err = DisabledProvider
            .embed(&["x".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn test_create_provider_hash_and_disabled() {
        let provider = create_provider(&EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.model_name(), "disabled");

        let config = EmbeddingConfig {
            provider: "hash".to_string(),
            dims: Some(64),
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dims(), 64);
        let v = embed_query(provider.as_ref(), "fn main").await.unwrap();
        assert_eq!(v.len(), 64);
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = EmbeddingConfig {
            provider: "cohere".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
