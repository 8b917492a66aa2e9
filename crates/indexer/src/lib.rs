//! # Meeting Indexer
//!
//! Keeps the record store and the semantic index in step.
//!
//! ## Pipeline
//!
//! ```text
//! Data directory (locked)
//!     │
//!     ├──> records.json ──> RecordStore (seeded once from JSON when empty)
//!     │
//!     ├──> index/ exists? ──yes──> VectorStore::load (no re-embedding)
//!     │                   └─no──> project every record → batch embed → save
//!     │
//!     └──> Catalog: schedule / cancel / query (write-through)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use meeting_indexer::{Catalog, CatalogOptions};
//! use meeting_vector_store::HashingEmbedder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> meeting_indexer::Result<()> {
//!     let options = CatalogOptions::new(".meeting-agent").with_seed_file("fake-notes/meetings.json");
//!     let (catalog, report) = Catalog::open(options, Arc::new(HashingEmbedder::default())).await?;
//!
//!     println!("{} records ({:?})", report.records, report.index);
//!     for hit in catalog.query("standup", 5).await? {
//!         println!("{} {:.3}", hit.metadata["meeting_id"], hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod catalog;
mod error;
mod index_lock;
mod stats;

pub use catalog::{CancelOutcome, Catalog, CatalogOptions};
pub use error::{CatalogError, Result};
pub use stats::{BootstrapReport, IndexSource};
