//! Cohere embedding provider using the Cohere embed API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Cohere embed API endpoint.
const COHERE_EMBED_URL: &str = "https://api.cohere.com/v1/embed";

/// The default Cohere embedding model.
const DEFAULT_MODEL: &str = "embed-english-v3.0";

/// The dimensionality of `embed-english-v3.0`.
const DEFAULT_DIMENSIONS: usize = 1024;

/// Input type for texts that will be stored in the vector index.
const INPUT_TYPE_DOCUMENT: &str = "search_document";

/// Input type for texts used to query the vector index.
const INPUT_TYPE_QUERY: &str = "search_query";

/// An [`EmbeddingProvider`] backed by the Cohere embed API.
///
/// Uses `reqwest` to call the `/v1/embed` endpoint directly. Cohere's v3
/// models embed documents and queries into asymmetric spaces, so this
/// provider sends `search_document` for ingestion batches and
/// `search_query` for question embeddings.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::cohere::CohereEmbeddingProvider;
///
/// let provider = CohereEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), 1024);
/// ```
pub struct CohereEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl CohereEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`embed-english-v3.0`, 1024 dimensions).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: "Cohere".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY").map_err(|_| RagError::EmbeddingError {
            provider: "Cohere".into(),
            message: "COHERE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name and its output dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    async fn request_embeddings(
        &self,
        texts: &[&str],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Cohere",
            batch_size = texts.len(),
            model = %self.model,
            input_type,
            "embedding batch"
        );

        let request_body = EmbedRequest {
            model: &self.model,
            texts: texts.to_vec(),
            input_type,
            truncate: "END",
        };

        let response = self
            .client
            .post(COHERE_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Cohere", error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: "Cohere".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);

            error!(provider = "Cohere", %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: "Cohere".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = "Cohere", error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: "Cohere".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(embed_response.embeddings)
    }
}

// ── Cohere API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: Vec<&'a str>,
    input_type: &'a str,
    truncate: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for CohereEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.request_embeddings(&[text], INPUT_TYPE_DOCUMENT).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "Cohere".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.request_embeddings(texts, INPUT_TYPE_DOCUMENT).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.request_embeddings(&[text], INPUT_TYPE_QUERY).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "Cohere".into(),
            message: "API returned empty response".into(),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
