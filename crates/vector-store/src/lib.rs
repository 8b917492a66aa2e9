//! # Meeting Vector Store
//!
//! Vector storage and similarity search for meeting documents.
//!
//! ## Features
//!
//! - **Exact similarity search** via a flat cosine index
//! - **Pluggable embeddings**: offline feature hashing or an Ollama endpoint
//! - **Persistent storage** with JSON serialization and a manifest
//! - **Keyed upserts** so a meeting has one live document
//!
//! ## Architecture
//!
//! ```text
//! (text, metadata)
//!     │
//!     ├──> Embedder (HashingEmbedder | OllamaEmbedder)
//!     │      └─> Vector[dimension]
//!     │
//!     ├──> FlatIndex
//!     │      └─> top-k by cosine similarity
//!     │
//!     └──> Persistent Storage
//!            └─> index/documents.json + index/manifest.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use meeting_vector_store::{HashingEmbedder, VectorStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> meeting_vector_store::Result<()> {
//!     let mut store = VectorStore::new(".meeting-agent/index", Arc::new(HashingEmbedder::default()));
//!
//!     store
//!         .insert("Meeting: Standup".into(), serde_json::json!({ "meeting_id": "M0001" }))
//!         .await?;
//!
//!     for result in store.query("standup", 5).await? {
//!         println!("{}: {:.3}", result.metadata["meeting_id"], result.score);
//!     }
//!
//!     store.save().await
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod paths;
mod store;
mod types;

pub use embeddings::{
    cosine_similarity, shares_term, tokenize, Embedder, HashingEmbedder, OllamaEmbedder,
    DEFAULT_HASH_DIMENSION, DEFAULT_OLLAMA_URL,
};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use paths::{
    config_path, index_dir, lock_path, records_path, CONFIG_FILE_NAME, DEFAULT_DATA_DIR_NAME,
    DOCUMENTS_FILE_NAME, INDEX_DIR_NAME, LOCK_FILE_NAME, MANIFEST_FILE_NAME, RECORDS_FILE_NAME,
};
pub use store::{VectorStore, DEFAULT_EMBED_TIMEOUT};
pub use types::{IndexManifest, SearchResult, StoredDocument, DOC_KEY_FIELD};
