//! Chat-completion model trait and the Groq backend.
//!
//! The pipeline asks one grounded question per call: the retrieved chunk
//! texts become a context block, and the model is instructed to answer only
//! from that context. No conversation history is kept between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};

/// The default Groq OpenAI-compatible API base URL.
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// The default chat model.
const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";

/// The default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// The grounded prompt template. The context block is substituted in before
/// the request is sent; the model must use the refusal phrase when the
/// context does not contain the answer.
const SYSTEM_PROMPT: &str = "Answer the user's question based only on the provided context. \
Give a properly structured, short answer. If the context does not contain the answer, \
reply exactly: \"I could not find that in the document.\"\n\nContext:\n{context}";

/// A model that produces one answer per question from a context block.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate an answer to `question` grounded in `context`.
    ///
    /// Each call is stateless; implementations must not retain history.
    async fn complete(&self, context: &str, question: &str) -> Result<String>;
}

/// A [`CompletionModel`] backed by Groq's OpenAI-compatible chat API.
///
/// Uses `reqwest` to call `{base_url}/chat/completions` with a single
/// non-streaming request. Works against any OpenAI-compatible endpoint via
/// [`with_base_url`](GroqCompletionModel::with_base_url).
pub struct GroqCompletionModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GroqCompletionModel {
    /// Create a new model client with the given API key.
    ///
    /// Uses the default model (`deepseek-r1-distill-llama-70b`) at
    /// temperature 0.7.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::CompletionError {
                provider: "Groq".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GROQ_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Create a new model client using the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| RagError::CompletionError {
            provider: "Groq".into(),
            message: "GROQ_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different OpenAI-compatible base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── CompletionModel implementation ─────────────────────────────────

#[async_trait]
impl CompletionModel for GroqCompletionModel {
    async fn complete(&self, context: &str, question: &str) -> Result<String> {
        debug!(
            provider = "Groq",
            model = %self.model,
            context_len = context.len(),
            "requesting completion"
        );

        let system = SYSTEM_PROMPT.replace("{context}", context);
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &system },
                ChatMessage { role: "user", content: question },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Groq", error = %e, "request failed");
                RagError::CompletionError {
                    provider: "Groq".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Groq", %status, "API error");
            return Err(RagError::CompletionError {
                provider: "Groq".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "Groq", error = %e, "failed to parse response");
            RagError::CompletionError {
                provider: "Groq".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        chat_response.choices.into_iter().next().map(|c| c.message.content).ok_or_else(|| {
            RagError::CompletionError {
                provider: "Groq".into(),
                message: "API returned no choices".into(),
            }
        })
    }
}
