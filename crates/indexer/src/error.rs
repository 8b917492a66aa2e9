use meeting_records::RecordError;
use meeting_vector_store::VectorStoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Record store error: {0}")]
    Record(#[from] RecordError),

    #[error("Vector store error: {0}")]
    Index(#[from] VectorStoreError),

    /// The record store committed but the index update failed; retry with `Catalog::repair`.
    #[error("Meeting {meeting_id} was saved but the search index was not updated: {source}")]
    Inconsistency {
        meeting_id: String,
        source: VectorStoreError,
    },

    #[error("Data directory {} is in use by another process", .0.display())]
    Locked(PathBuf),

    #[error("Invalid seed file {}: {source}", .path.display())]
    Seed { path: PathBuf, source: RecordError },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    /// Meeting id whose index entry is stale, if this is a partial failure
    pub fn inconsistent_meeting(&self) -> Option<&str> {
        match self {
            Self::Inconsistency { meeting_id, .. } => Some(meeting_id),
            _ => None,
        }
    }
}
