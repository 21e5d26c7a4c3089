//! Text extraction from uploaded files.
//!
//! Two strategies cover the supported inputs: audio and video content types
//! go through the transcription collaborator, and `.pdf` filenames go through
//! in-memory PDF parsing. Extraction is failure-containing by design: a page
//! that cannot be read contributes an empty string, and a malformed PDF
//! container yields an empty document rather than an error. Only an input
//! matching neither strategy is rejected.

use crate::transcribe::TranscriptionClient;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while routing an upload to an extraction strategy.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Input matched neither the transcription nor the PDF strategy.
    #[error("Unsupported file type")]
    UnsupportedFileType,
}

/// Routes uploaded bytes to the extraction strategy matching their declared type.
pub struct Extractor {
    transcriber: Arc<dyn TranscriptionClient>,
}

impl Extractor {
    /// Build an extractor around the given transcription collaborator.
    pub fn new(transcriber: Arc<dyn TranscriptionClient>) -> Self {
        Self { transcriber }
    }

    /// Convert uploaded bytes into plain text, or reject the input.
    ///
    /// The returned text may be empty; that is a successful outcome for
    /// inputs whose extraction partially or fully failed.
    pub async fn extract(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, ExtractError> {
        if content_type.starts_with("audio") || content_type.starts_with("video") {
            return Ok(self.transcriber.transcribe(data, filename).await);
        }

        if filename.to_lowercase().ends_with(".pdf") {
            return Ok(extract_pdf_text(data).await);
        }

        Err(ExtractError::UnsupportedFileType)
    }
}

/// Extract text from PDF bytes, one page at a time.
///
/// lopdf parsing is CPU-bound, so it runs on the blocking pool to keep the
/// async workers free for concurrent requests.
async fn extract_pdf_text(data: Vec<u8>) -> String {
    let result = tokio::task::spawn_blocking(move || pdf_text(&data)).await;
    match result {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(%error, "PDF extraction task failed; substituting empty text");
            String::new()
        }
    }
}

fn pdf_text(data: &[u8]) -> String {
    let document = match lopdf::Document::load_mem(data) {
        Ok(document) => document,
        Err(error) => {
            tracing::warn!(%error, "Failed to parse PDF container; substituting empty text");
            return String::new();
        }
    };

    // get_pages returns a BTreeMap, so pages come out in order. Each page is
    // extracted independently; a failing page contributes an empty string
    // instead of aborting the document.
    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|page_number| {
            document.extract_text(&[*page_number]).unwrap_or_else(|error| {
                tracing::debug!(page = page_number, %error, "Page extraction failed");
                String::new()
            })
        })
        .collect();

    pages.join("\n\n").trim().to_string()
}
