//! # Meeting Records
//!
//! Canonical meeting records and their searchable projection.
//!
//! ## Architecture
//!
//! ```text
//! MeetingDetails (partial, user supplied)
//!     │
//!     ├──> validate → ValidatedDetails
//!     │
//!     ├──> RecordStore::create
//!     │      └─> MeetingRecord { M####, status = scheduled }
//!     │
//!     └──> project(record)
//!            └─> (text, metadata) for the semantic index
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use meeting_records::{project, MeetingDetails, RecordStore};
//!
//! #[tokio::main]
//! async fn main() -> meeting_records::Result<()> {
//!     let mut store = RecordStore::open("records.json").await?;
//!     let id = store.create(MeetingDetails {
//!         title: Some("Demo".into()),
//!         date: Some("2024-02-01".into()),
//!         start_time: Some("10:00".into()),
//!         end_time: Some("11:00".into()),
//!         attendees: Some(vec!["a@x.com".into()]),
//!         location: None,
//!     }).await?;
//!
//!     if let Some(record) = store.get(&id) {
//!         let (text, _metadata) = project(record);
//!         println!("{text}");
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod ids;
mod projection;
mod seed;
mod store;
mod types;

pub use error::{RecordError, Result};
pub use ids::{is_meeting_id, MeetingIdGenerator};
pub use projection::{metadata, project, record_from_metadata, render_text};
pub use seed::{load_seed_file, parse_seed};
pub use store::RecordStore;
pub use types::{
    MeetingDetails, MeetingRecord, MeetingStatus, ValidatedDetails, DEFAULT_LOCATION,
};
