//! OpenAI embeddings provider.
//!
//! Talks to any endpoint implementing `POST {base_url}/v1/embeddings`
//! (OpenAI, Azure-compatible gateways, LM Studio, vLLM).
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY`: API key (required)
//! - `OPENAI_BASE_URL`: Custom API base URL
//! - `OPENAI_EMBEDDING_MODEL`: Model to use (default: text-embedding-3-small)
//!
//! # Example
//!
//! ```rust,ignore
//! use edgequake_retrieval::{EmbeddingProvider, OpenAIEmbeddingProvider};
//!
//! let provider = OpenAIEmbeddingProvider::from_env()?;
//! let embeddings = provider.embed(&["Hello, world!".to_string()]).await?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::EmbeddingError;
use crate::traits::EmbeddingProvider;

/// Default embedding model
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default API base URL
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI-compatible embeddings provider.
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProvider {
    client: Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    embedding_dimension: usize,
}

/// Builder for OpenAIEmbeddingProvider
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProviderBuilder {
    api_key: Option<String>,
    base_url: String,
    embedding_model: String,
    embedding_dimension: Option<usize>,
    timeout: Duration,
}

impl Default for OpenAIEmbeddingProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            embedding_model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            embedding_dimension: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OpenAIEmbeddingProviderBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL, without the `/v1` suffix
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the embedding model
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Override the dimension reported for the model
    pub fn embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = Some(dimension);
        self
    }

    /// Set the HTTP request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the provider
    pub fn build(self) -> Result<OpenAIEmbeddingProvider, EmbeddingError> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbeddingError::ConfigError("OPENAI_API_KEY is required".to_string()))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| EmbeddingError::NetworkError(e.to_string()))?;

        let embedding_dimension = self
            .embedding_dimension
            .unwrap_or_else(|| get_model_dimension(&self.embedding_model));

        Ok(OpenAIEmbeddingProvider {
            client,
            api_key,
            base_url: self.base_url,
            embedding_model: self.embedding_model,
            embedding_dimension,
        })
    }
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from environment variables.
    pub fn from_env() -> Result<Self, EmbeddingError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            EmbeddingError::ConfigError("OPENAI_API_KEY environment variable is required".to_string())
        })?;

        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());

        let embedding_model = std::env::var("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string());

        OpenAIEmbeddingProviderBuilder::new()
            .api_key(api_key)
            .base_url(base_url)
            .embedding_model(embedding_model)
            .build()
    }

    /// Create a new builder
    pub fn builder() -> OpenAIEmbeddingProviderBuilder {
        OpenAIEmbeddingProviderBuilder::new()
    }

    fn endpoint(&self) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/embeddings", self.base_url)
        } else {
            format!("{}/v1/embeddings", self.base_url)
        }
    }
}

/// Get the default dimension for an OpenAI model
fn get_model_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" => 1536,
        "text-embedding-ada-002" => 1536,
        _ => 1536,
    }
}

// Request/Response structures for the embeddings API

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn map_status_error(status: StatusCode, body: &str) -> EmbeddingError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => EmbeddingError::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            EmbeddingError::ConfigError(format!("Authentication failed ({}): {}", status, detail))
        }
        _ => EmbeddingError::ApiError(format!("OpenAI API error ({}): {}", status, detail)),
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn max_tokens(&self) -> usize {
        8191
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(
            "OpenAI embedding request: {} texts with model {}",
            texts.len(),
            self.embedding_model
        );

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &error_text));
        }

        let response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let mut embeddings: Vec<_> = response
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();
        embeddings.sort_by_key(|(i, _)| *i);

        let embeddings: Vec<Vec<f32>> = embeddings.into_iter().map(|(_, e)| e).collect();
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        debug!(
            "OpenAI embedding response: {} embeddings of dimension {}",
            embeddings.len(),
            embeddings.first().map(|e| e.len()).unwrap_or(0)
        );

        Ok(embeddings)
    }
}
