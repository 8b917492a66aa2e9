use crate::error::{RecordError, Result};
use crate::ids::is_meeting_id;
use crate::types::MeetingRecord;
use std::path::Path;

/// Read a seed file: a JSON array of complete meeting records.
pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<MeetingRecord>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let records = parse_seed(&bytes)?;
    log::info!("Loaded {} seed records from {:?}", records.len(), path);
    Ok(records)
}

pub fn parse_seed(bytes: &[u8]) -> Result<Vec<MeetingRecord>> {
    let records: Vec<MeetingRecord> = serde_json::from_slice(bytes)?;
    let malformed: Vec<String> = records
        .iter()
        .filter(|r| !is_meeting_id(&r.meeting_id))
        .map(|r| format!("malformed meeting_id: '{}'", r.meeting_id))
        .collect();
    if !malformed.is_empty() {
        return Err(RecordError::validation(malformed));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeetingStatus;

    #[test]
    fn parses_seed_array() {
        let raw = br#"[
            {"meeting_id":"M0001","title":"Standup","date":"2024-01-10","start_time":"09:00",
             "end_time":"09:15","location":"Room 4","attendees":["ana@x.com"],"status":"scheduled"},
            {"meeting_id":"M0002","title":"Retro","date":"2024-01-12","start_time":"15:00",
             "end_time":"16:00","attendees":[],"status":"cancelled"}
        ]"#;
        let records = parse_seed(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].updated_at, 0);
        assert_eq!(records[1].location, "Online");
        assert_eq!(records[1].status, MeetingStatus::Cancelled);
    }

    #[test]
    fn rejects_malformed_ids() {
        let raw = br#"[{"meeting_id":"42","title":"x","date":"2024-01-10","start_time":"09:00",
            "end_time":"09:15","location":"x","attendees":[],"status":"scheduled"}]"#;
        assert!(matches!(
            parse_seed(raw),
            Err(RecordError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_unknown_status() {
        let raw = br#"[{"meeting_id":"M0001","title":"x","date":"2024-01-10","start_time":"09:00",
            "end_time":"09:15","location":"x","attendees":[],"status":"tentative"}]"#;
        assert!(matches!(
            parse_seed(raw),
            Err(RecordError::SerializationError(_))
        ));
    }
}
