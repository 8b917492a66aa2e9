use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata field used as the natural key of a document
pub const DOC_KEY_FIELD: &str = "meeting_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: u64,
    pub text: String,
    pub metadata: Value,
    pub vector: Vec<f32>,
}

impl StoredDocument {
    /// Value of [`DOC_KEY_FIELD`] in the metadata, if present
    pub fn key(&self) -> Option<&str> {
        self.metadata.get(DOC_KEY_FIELD).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc_id: u64,
    pub text: String,
    pub metadata: Value,
    pub score: f32,
}

/// On-disk description of a persisted index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub version: u32,
    pub embedder_id: String,
    pub dimension: usize,
    pub next_doc_id: u64,
    pub documents: usize,
}
