//! Speech-to-text collaborator for audio and video uploads.
//!
//! The contract is deliberately infallible from the caller's side: any
//! internal failure (missing credential, transport fault, provider error) is
//! logged and absorbed into a bracketed placeholder transcript, so an upload
//! still succeeds with degraded text instead of failing the request.

use crate::config::{get_config, llm_api_key};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

/// Placeholder transcript returned when transcription cannot be performed.
pub const TRANSCRIPTION_PLACEHOLDER: &str = "[transcription unavailable]";

#[derive(Debug, Error)]
enum TranscriptionError {
    #[error("transcription credential absent")]
    MissingCredential,
    #[error("transcription endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("transcription endpoint returned {0}: {1}")]
    RequestFailed(reqwest::StatusCode, String),
    #[error("malformed transcription response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by speech-to-text backends.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe the uploaded bytes, never failing to the caller.
    ///
    /// On internal failure the returned string is a placeholder beginning
    /// with `[`.
    async fn transcribe(&self, data: Vec<u8>, filename: &str) -> String;
}

/// Client for OpenAI-compatible `/audio/transcriptions` endpoints.
pub struct OpenAiTranscriptionClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OpenAiTranscriptionClient {
    /// Construct a client from the loaded configuration.
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(
            config.transcription_base_url.clone(),
            config.transcription_model.clone(),
        )
    }

    /// Construct a client against an explicit endpoint and model.
    pub fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("docqa/transcribe")
            .build()
            .expect("Failed to construct reqwest::Client for transcription");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'))
    }

    async fn request_transcript(
        &self,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<String, TranscriptionError> {
        let key = llm_api_key().ok_or(TranscriptionError::MissingCredential)?;

        let file_part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|error| TranscriptionError::InvalidResponse(error.to_string()))?;
        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                TranscriptionError::Unreachable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::RequestFailed(status, body));
        }

        #[derive(Deserialize)]
        struct TranscriptionResponse {
            text: String,
        }

        let body: TranscriptionResponse = response.json().await.map_err(|error| {
            TranscriptionError::InvalidResponse(format!("failed to decode transcript: {error}"))
        })?;

        Ok(body.text)
    }
}

#[async_trait]
impl TranscriptionClient for OpenAiTranscriptionClient {
    async fn transcribe(&self, data: Vec<u8>, filename: &str) -> String {
        match self.request_transcript(data, filename).await {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(%error, filename, "Transcription failed; substituting placeholder");
                TRANSCRIPTION_PLACEHOLDER.to_string()
            }
        }
    }
}
