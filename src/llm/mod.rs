//! Chat-completion collaborator used by the answer and summarization flows.
//!
//! Misconfiguration is soft degradation, not an error: when the credential is
//! missing or rejected the client returns a bracketed placeholder string so
//! the service stays usable and the health endpoint can surface the state.
//! Only transport faults and unexpected provider responses surface as errors,
//! which the answer flow maps to a server-side failure.

use crate::config::{get_config, llm_api_key};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Placeholder returned when no credential is present in the environment.
pub const NOT_CONFIGURED_PLACEHOLDER: &str =
    "[LLM not configured: set OPENAI_API_KEY to enable answers]";

/// Placeholder returned when the provider rejects the credential.
pub const UNAUTHORIZED_PLACEHOLDER: &str = "[LLM request rejected: check OPENAI_API_KEY]";

/// Errors surfaced when the completion call genuinely fails.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// Provider endpoint could not be reached.
    #[error("LLM provider unreachable: {0}")]
    Unreachable(String),
    /// Provider returned a non-success status outside the auth family.
    #[error("LLM provider returned {status}: {body}")]
    RequestFailed {
        /// HTTP status reported by the provider.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Provider response could not be parsed.
    #[error("Malformed LLM response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by chat-completion backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce a completion for the supplied prompt.
    ///
    /// `Ok` may carry a bracketed placeholder instead of a real answer when
    /// the backend is unconfigured; callers pass the string through as-is.
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiChatClient {
    /// Construct a client from the loaded configuration.
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.llm_max_tokens,
        )
    }

    /// Construct a client against an explicit endpoint and model.
    pub fn new(base_url: String, model: String, max_tokens: u32) -> Self {
        let http = Client::builder()
            .user_agent("docqa/llm")
            .build()
            .expect("Failed to construct reqwest::Client for LLM calls");
        Self {
            http,
            base_url,
            model,
            max_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
        let Some(key) = llm_api_key() else {
            tracing::debug!("LLM credential absent; returning placeholder answer");
            return Ok(NOT_CONFIGURED_PLACEHOLDER.to_string());
        };

        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_tokens,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmClientError::Unreachable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(%status, "LLM provider rejected the credential");
            return Ok(UNAUTHORIZED_PLACEHOLDER.to_string());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::RequestFailed { status, body });
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            LlmClientError::InvalidResponse(format!("failed to decode completion: {error}"))
        })?;

        let answer = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmClientError::InvalidResponse("completion carried no choices".into())
            })?;

        Ok(answer)
    }
}
