use thiserror::Error;

/// Result type for record store operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised by the record store and its helpers
#[derive(Error, Debug)]
pub enum RecordError {
    /// Required fields are missing or malformed; nothing was written
    #[error("Validation error: {}", .problems.join("; "))]
    Validation { problems: Vec<String> },

    /// No record with this meeting id
    #[error("Meeting not found: {0}")]
    NotFound(String),

    /// A record with this meeting id already exists
    #[error("Duplicate meeting id: {0}")]
    Duplicate(String),

    /// Every `M0000`..`M9999` id is taken
    #[error("Meeting id space exhausted")]
    IdSpaceExhausted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl RecordError {
    pub fn validation(problems: Vec<String>) -> Self {
        Self::Validation { problems }
    }

    pub fn not_found(meeting_id: impl Into<String>) -> Self {
        Self::NotFound(meeting_id.into())
    }

    /// Missing or malformed fields when this is a validation error
    pub fn problems(&self) -> &[String] {
        match self {
            Self::Validation { problems } => problems,
            _ => &[],
        }
    }
}
