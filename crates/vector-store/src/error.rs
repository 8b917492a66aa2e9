use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Embedding timed out after {0} ms")]
    EmbeddingTimeout(u64),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Index was built with embedder '{stored}', current embedder is '{current}'")]
    ManifestMismatch { stored: String, current: String },
}

impl VectorStoreError {
    /// Failures worth retrying (transient embedding backend trouble)
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingTimeout(_) | Self::EmbeddingError(_))
    }
}
