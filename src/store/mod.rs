//! In-memory document store shared by the upload and chat flows.
//!
//! The store is append-only for the lifetime of the process: an upload inserts
//! a document under a freshly generated UUID and nothing ever overwrites or
//! removes it. Documents are immutable after insertion, so concurrent readers
//! only contend with the brief write lock taken by inserts.

use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// A document captured at upload time: the original filename plus the plain
/// text produced by extraction. The text may legitimately be empty when
/// extraction recovered from a malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Filename supplied with the upload.
    pub filename: String,
    /// Extracted plain text.
    pub text: String,
}

/// Process-wide mapping from generated identifier to stored document.
///
/// Constructed once near process start and shared through the service; tests
/// build isolated instances instead of touching global state.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under a freshly generated identifier and return the id.
    ///
    /// UUID v4 gives 122 random bits, so collisions are not a practical
    /// concern and existing keys are never overwritten.
    pub fn put(&self, filename: String, text: String) -> String {
        let id = Uuid::new_v4().to_string();
        let mut documents = self.documents.write().expect("document store lock poisoned");
        documents.insert(id.clone(), Document { filename, text });
        id
    }

    /// Look up a document by id. Absence is a normal outcome for unknown or
    /// stale ids, not an error.
    pub fn get(&self, id: &str) -> Option<Document> {
        let documents = self.documents.read().expect("document store lock poisoned");
        documents.get(id).cloned()
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        let documents = self.documents.read().expect("document store lock poisoned");
        documents.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
