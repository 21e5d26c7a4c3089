#![deny(missing_docs)]

//! Core library for the docqa grounded document Q&A backend.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Upload-to-text extraction strategies.
pub mod extract;
/// Chat-completion collaborator client.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Question-answering pipeline and prompt assembly.
pub mod qa;
/// In-memory document store.
pub mod store;
/// Speech-to-text collaborator client.
pub mod transcribe;
