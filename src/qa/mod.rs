//! Question answering over uploaded documents.
//!
//! [`QaService`] coordinates the full pipeline shared by the HTTP surface:
//! extraction of uploaded bytes, append-only document storage, grounded
//! prompt assembly, and the LLM calls behind the chat and summarize
//! endpoints. Construct the service once near process start and share it
//! through an `Arc`.

pub mod prompt;

use crate::{
    config::{get_config, llm_api_key},
    extract::{ExtractError, Extractor},
    llm::{LlmClient, LlmClientError, OpenAiChatClient},
    store::DocumentStore,
    transcribe::OpenAiTranscriptionClient,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Errors surfaced by the question-answering pipeline.
///
/// The split between client and server faults drives HTTP status mapping at
/// the boundary: everything here except [`QaError::Llm`] is bad input.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    /// Upload content matched no extraction strategy.
    #[error(transparent)]
    UnsupportedFile(#[from] ExtractError),
    /// Chat requested without a resolvable, non-empty document.
    #[error(
        "No document text available for the given doc_id. Please upload a document and retry."
    )]
    NoDocument,
    /// The LLM call failed; the one server-side fault in the pipeline.
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmClientError),
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Generated identifier under which the document was stored.
    pub id: String,
    /// Filename supplied with the upload.
    pub filename: String,
    /// Extracted plain text (possibly empty).
    pub text: String,
}

/// Abstraction over the question-answering pipeline used by the HTTP surface.
#[async_trait]
pub trait QaApi: Send + Sync {
    /// Extract text from an upload and store it under a fresh identifier.
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: String,
        content_type: String,
    ) -> Result<UploadOutcome, QaError>;

    /// Answer a question strictly from the document stored under `doc_id`.
    async fn chat(&self, doc_id: Option<String>, question: String) -> Result<String, QaError>;

    /// Summarize arbitrary text without any document-store interaction.
    async fn summarize(&self, text: String) -> Result<String, QaError>;

    /// Whether the LLM credential is currently present in the environment.
    ///
    /// Checked live on every call so the health endpoint reflects key
    /// changes without a restart.
    fn llm_configured(&self) -> bool;
}

/// Production implementation of [`QaApi`] backed by the HTTP collaborators.
pub struct QaService {
    store: DocumentStore,
    extractor: Extractor,
    llm: Box<dyn LlmClient>,
    max_document_chars: Option<usize>,
}

impl QaService {
    /// Build the service from the loaded configuration.
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(
            Extractor::new(Arc::new(OpenAiTranscriptionClient::from_config())),
            Box::new(OpenAiChatClient::from_config()),
            config.max_document_chars,
        )
    }

    /// Build the service from explicit collaborators.
    pub fn new(
        extractor: Extractor,
        llm: Box<dyn LlmClient>,
        max_document_chars: Option<usize>,
    ) -> Self {
        Self {
            store: DocumentStore::new(),
            extractor,
            llm,
            max_document_chars,
        }
    }

    /// Read-only access to the backing store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

#[async_trait]
impl QaApi for QaService {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: String,
        content_type: String,
    ) -> Result<UploadOutcome, QaError> {
        let size = data.len();
        let text = self.extractor.extract(data, &filename, &content_type).await?;
        let id = self.store.put(filename.clone(), text.clone());
        tracing::info!(
            id = %id,
            filename = %filename,
            content_type = %content_type,
            bytes = size,
            text_chars = text.chars().count(),
            "Stored uploaded document"
        );
        Ok(UploadOutcome { id, filename, text })
    }

    async fn chat(&self, doc_id: Option<String>, question: String) -> Result<String, QaError> {
        let document = doc_id.as_deref().and_then(|id| self.store.get(id));
        let document = match document {
            Some(document) if !document.text.is_empty() => document,
            // No id, unknown id, or empty stored text: short-circuit before
            // any prompt is built or the LLM is contacted.
            _ => return Err(QaError::NoDocument),
        };

        let prompt = prompt::build_grounded_prompt(
            &document.text,
            Some(&document.filename),
            &question,
            self.max_document_chars,
        );
        let answer = self.llm.complete(&prompt).await?;
        tracing::debug!(
            doc_id = ?doc_id,
            prompt_chars = prompt.chars().count(),
            "Chat answered"
        );
        Ok(answer)
    }

    async fn summarize(&self, text: String) -> Result<String, QaError> {
        let prompt = prompt::build_summary_prompt(&text);
        Ok(self.llm.complete(&prompt).await?)
    }

    fn llm_configured(&self) -> bool {
        llm_api_key().is_some()
    }
}
