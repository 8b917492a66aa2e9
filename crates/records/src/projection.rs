use crate::error::Result;
use crate::types::MeetingRecord;
use serde::Deserialize;
use serde_json::{json, Value};

/// Render a record as the searchable text document plus its structured metadata.
pub fn project(record: &MeetingRecord) -> (String, Value) {
    (render_text(record), metadata(record))
}

/// Human-readable text that gets embedded
pub fn render_text(record: &MeetingRecord) -> String {
    format!(
        "Meeting: {}\nDate: {}\nLocation: {}\nAttendees: {}",
        record.title,
        record.date,
        record.location,
        record.attendees.join(", ")
    )
}

/// Every structured field, verbatim
pub fn metadata(record: &MeetingRecord) -> Value {
    json!({
        "meeting_id": record.meeting_id,
        "title": record.title,
        "date": record.date,
        "start_time": record.start_time,
        "end_time": record.end_time,
        "location": record.location,
        "attendees": record.attendees,
        "status": record.status,
        "updated_at": record.updated_at,
    })
}

/// Parse metadata produced by [`project`] back into a record.
pub fn record_from_metadata(metadata: &Value) -> Result<MeetingRecord> {
    Ok(MeetingRecord::deserialize(metadata)?)
}
