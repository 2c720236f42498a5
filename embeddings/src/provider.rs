//! Embedding providers.
//!
//! Supports the OpenAI embeddings API and a self-hosted sentence-transformer
//! server. Both return unit-length vectors so cosine scores are comparable
//! regardless of which provider produced them.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Embedding;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Default timeout applied to each HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request for generating embeddings.
///
/// Always embedded with the provider's configured model, so every vector in
/// a cache comes from the model recorded there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

impl EmbeddingResponse {
    /// Build a response from a raw vector, normalizing it to unit length.
    ///
    /// Fails with [`EmbeddingError::EmptyEmbedding`] on a zero-length vector.
    pub fn from_vector(mut embedding: Embedding, model: impl Into<String>) -> Result<Self> {
        if embedding.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        normalize(&mut embedding);
        Ok(Self {
            dimension: embedding.len(),
            embedding,
            model: model.into(),
            tokens_used: None,
        })
    }
}

/// Result of a provider health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Whether the provider can serve requests.
    pub ok: bool,

    /// Model the provider reports.
    pub model: String,

    /// Extra detail for a failed check.
    pub detail: Option<String>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model this provider embeds with.
    fn model(&self) -> &str;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;

    /// Probe the provider without embedding anything.
    async fn health(&self) -> Result<ProviderHealth> {
        let ok = self.is_available();
        Ok(ProviderHealth {
            ok,
            model: self.model().to_string(),
            detail: (!ok).then(|| "provider not configured".to_string()),
        })
    }
}

/// Build the provider described by `config`.
pub fn build_provider(config: &ProviderConfig) -> Box<dyn EmbeddingProvider> {
    let timeout = config.timeout();
    match config.kind {
        ProviderKind::OpenAI => {
            let mut provider = OpenAIProvider::new().with_timeout(timeout);
            if let Some(ref url) = config.base_url {
                provider = provider.with_base_url(url.clone());
            }
            if let Some(ref model) = config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(ref key) = config.api_key {
                provider = provider.with_api_key(key.clone());
            }
            Box::new(provider)
        }
        ProviderKind::LocalServer => {
            let mut provider = LocalServerProvider::new().with_timeout(timeout);
            if let Some(ref url) = config.base_url {
                provider = provider.with_base_url(url.clone());
            }
            if let Some(ref model) = config.model {
                provider = provider.with_model(model.clone());
            }
            Box::new(provider)
        }
    }
}

fn transport_error(err: reqwest::Error) -> EmbeddingError {
    EmbeddingError::ProviderUnavailable(err.to_string())
}

/// OpenAI embedding provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "text-embedding-3-small".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        debug!("Generating embedding with model: {}", self.default_model);

        let body = serde_json::json!({
            "input": request.text,
            "model": self.default_model
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            let error_text = response.text().await.unwrap_or_default();

            // OpenAI signals an exhausted balance with a 429 as well.
            if let Ok(body) = serde_json::from_str::<OpenAIErrorBody>(&error_text) {
                if body.error.is_quota() {
                    return Err(EmbeddingError::QuotaExceeded(body.error.message));
                }
            }

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ProviderUnavailable(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: OpenAIEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let data = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| {
                EmbeddingError::InvalidResponse("No embedding in response".to_string())
            })?;

        let mut response = EmbeddingResponse::from_vector(data.embedding, result.model)?;
        response.tokens_used = result.usage.map(|u| u.total_tokens);

        debug!("Generated embedding with {} dimensions", response.dimension);

        Ok(response)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAIErrorDetail {
    fn is_quota(&self) -> bool {
        self.code.as_deref() == Some("insufficient_quota")
            || self.kind.as_deref() == Some("insufficient_quota")
    }
}

/// Provider backed by a self-hosted sentence-transformer server.
///
/// The server exposes `POST /embed` taking `{"text": ...}` and answering
/// `{"embedding": [...]}`, plus `GET /health`.
pub struct LocalServerProvider {
    /// Server base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model label reported by this provider.
    model: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl LocalServerProvider {
    /// Create a provider pointing at the default local address.
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            client: reqwest::Client::new(),
            model: "thenlper/gte-large".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the server base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model label.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for LocalServerProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalServerProvider {
    fn name(&self) -> &str {
        "local-server"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .timeout(self.timeout)
            .json(&LocalEmbedRequest {
                text: &request.text,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<LocalErrorBody>(&error_text)
                .map(|b| b.detail)
                .unwrap_or(error_text);
            return Err(EmbeddingError::ProviderUnavailable(format!(
                "embedding server error ({status}): {detail}"
            )));
        }

        let result: LocalEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        EmbeddingResponse::from_vector(result.embedding, self.model.clone())
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn health(&self) -> Result<ProviderHealth> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            warn!("Embedding server health check returned {}", response.status());
            return Ok(ProviderHealth {
                ok: false,
                model: self.model.clone(),
                detail: Some(format!("health endpoint returned {}", response.status())),
            });
        }

        let health: LocalHealthResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(ProviderHealth {
            ok: health.status == "ok" && health.loaded,
            detail: (!health.loaded).then(|| "model not loaded".to_string()),
            model: health.model,
        })
    }
}

#[derive(Debug, Serialize)]
struct LocalEmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct LocalEmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct LocalErrorBody {
    detail: String,
}

#[derive(Debug, Deserialize)]
struct LocalHealthResponse {
    status: String,
    model: String,
    loaded: bool,
}
