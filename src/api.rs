//! HTTP surface for the document Q&A backend.
//!
//! This module exposes a compact Axum router mirroring the original API:
//!
//! - `POST /api/upload` – Multipart upload of an audio/video/PDF file; extracts text,
//!   stores it under a generated id, and returns `{id, filename, text}`.
//! - `POST /api/chat` – Answer a question strictly from a stored document's text.
//! - `POST /api/summarize` – Summarize arbitrary text in three bullet points.
//! - `GET /api/health` – Liveness plus whether the LLM credential is currently present.
//! - `GET /` – Plain status banner.
//!
//! Client faults (unsupported uploads, missing documents) map to 400 responses, LLM
//! invocation failures to 500; both carry a structured `{"error": message}` body.

use crate::config::get_config;
use crate::qa::{QaApi, QaError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the Q&A API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: QaApi + 'static,
{
    let api = Router::new()
        .route(
            "/upload",
            post(upload::<S>).layer(DefaultBodyLimit::max(get_config().max_upload_bytes)),
        )
        .route("/chat", post(chat::<S>))
        .route("/summarize", post(summarize::<S>))
        .route("/health", get(health::<S>));

    Router::new()
        .route("/", get(root_status))
        .nest("/api", api)
        .with_state(service)
}

/// Success response for the `POST /api/upload` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    /// Generated identifier to pass to `POST /api/chat`.
    id: String,
    /// Filename supplied with the upload.
    filename: String,
    /// Extracted text (possibly empty when extraction partially failed).
    text: String,
}

/// Upload a file, extract its text, and store it under a generated id.
///
/// Expects a multipart body with a `file` field. The declared part content
/// type selects the extraction strategy; a missing one defaults to
/// `application/octet-stream`, which is rejected unless the filename ends in
/// `.pdf`.
async fn upload<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: QaApi,
{
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(format!("Malformed multipart body: {error}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|error| AppError::bad_request(format!("Failed to read file: {error}")))?;
        file = Some((data.to_vec(), filename, content_type));
    }

    let (data, filename, content_type) =
        file.ok_or_else(|| AppError::bad_request("Missing multipart field 'file'".to_string()))?;

    let outcome = service.upload(data, filename, content_type).await?;
    tracing::info!(id = %outcome.id, filename = %outcome.filename, "Upload completed");
    Ok(Json(UploadResponse {
        id: outcome.id,
        filename: outcome.filename,
        text: outcome.text,
    }))
}

/// Request body for the `POST /api/chat` endpoint.
#[derive(Deserialize)]
struct ChatRequest {
    /// Identifier returned by a previous upload.
    #[serde(default)]
    doc_id: Option<String>,
    /// Natural-language question to answer from the document.
    question: String,
}

/// Success response for the `POST /api/chat` endpoint.
#[derive(Serialize)]
struct ChatResponse {
    /// Raw answer returned by the LLM.
    answer: String,
}

/// Answer a question strictly from the stored document's text.
async fn chat<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError>
where
    S: QaApi,
{
    let answer = service.chat(request.doc_id, request.question).await?;
    Ok(Json(ChatResponse { answer }))
}

/// Form body for the `POST /api/summarize` endpoint.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Text to summarize.
    text: String,
}

/// Success response for the `POST /api/summarize` endpoint.
#[derive(Serialize)]
struct SummarizeResponse {
    /// Three-bullet summary produced by the LLM.
    summary: String,
}

/// Summarize arbitrary text; no document-store interaction.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    axum::extract::Form(request): axum::extract::Form<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: QaApi,
{
    let summary = service.summarize(request.text).await?;
    Ok(Json(SummarizeResponse { summary }))
}

/// Response body for `GET /api/health`.
#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    llm_configured: bool,
}

/// Report liveness and whether the LLM credential is present right now.
async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: QaApi,
{
    Json(HealthResponse {
        ok: true,
        llm_configured: service.llm_configured(),
    })
}

/// Plain status banner for the root path.
async fn root_status() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "message": "docqa backend is running" }))
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<QaError> for AppError {
    fn from(error: QaError) -> Self {
        let status = match &error {
            // The only infrastructure fault in the pipeline; everything else
            // is bad input.
            QaError::Llm(_) => {
                tracing::error!(error = %error, "LLM invocation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            QaError::UnsupportedFile(_) | QaError::NoDocument => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
