use serde::{Deserialize, Serialize};

/// How the semantic index was obtained at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexSource {
    /// Reused the persisted index
    Loaded { documents: usize },
    /// No persisted index existed; embedded every record
    Built { documents: usize },
    /// The persisted index could not be used and was rebuilt
    Rebuilt { documents: usize, reason: String },
}

/// Statistics about catalog startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Records loaded from the seed file (0 unless the store was empty)
    pub seeded: usize,

    /// Records in the store after seeding
    pub records: usize,

    pub index: IndexSource,

    /// Records whose index entry was stale and got re-indexed
    pub repaired: usize,

    /// Stale records that could not be re-indexed
    pub stale: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}
