use crate::error::{RecordError, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Location used when a meeting is scheduled without one
pub const DEFAULT_LOCATION: &str = "Online";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Lifecycle state of a meeting. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Cancelled,
}

impl MeetingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical meeting record owned by the record store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingRecord {
    /// `M` followed by four digits
    pub meeting_id: String,

    pub title: String,

    /// ISO-8601 calendar date (`YYYY-MM-DD`)
    pub date: String,

    /// ISO-8601 time of day (`HH:MM` or `HH:MM:SS`)
    pub start_time: String,

    pub end_time: String,

    #[serde(default = "default_location")]
    pub location: String,

    pub attendees: Vec<String>,

    pub status: MeetingStatus,

    /// Unix milliseconds of the last write; seed data may omit it
    #[serde(default)]
    pub updated_at: u64,
}

impl MeetingRecord {
    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    /// `HH:MM-HH:MM` span used in user-facing listings
    pub fn time_span(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

/// Partial record accepted when scheduling.
///
/// Every field is optional at the type level so that validation can report
/// all missing fields in one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingDetails {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, alias = "meeting_date")]
    pub date: Option<String>,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default)]
    pub attendees: Option<Vec<String>>,

    #[serde(default)]
    pub location: Option<String>,
}

/// Details that passed validation, trimmed and with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDetails {
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub attendees: Vec<String>,
    pub location: String,
}

impl MeetingDetails {
    /// Check required fields and formats, collecting every problem.
    pub fn validate(&self) -> Result<ValidatedDetails> {
        let mut problems = Vec::new();

        let title = required(&self.title, "title", &mut problems);
        let date = required(&self.date, "date", &mut problems);
        let start_time = required(&self.start_time, "start_time", &mut problems);
        let end_time = required(&self.end_time, "end_time", &mut problems);

        let attendees: Vec<String> = self
            .attendees
            .iter()
            .flatten()
            .map(|a| a.trim().to_string())
            .collect();
        if attendees.is_empty() {
            problems.push("missing field: attendees".to_string());
        } else if attendees.iter().any(String::is_empty) {
            problems.push("malformed attendees: blank entry".to_string());
        }

        if let Some(date) = &date {
            if NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
                problems.push(format!("malformed date: '{date}' (expected YYYY-MM-DD)"));
            }
        }

        let start = start_time
            .as_deref()
            .and_then(|raw| parse_time("start_time", raw, &mut problems));
        let end = end_time
            .as_deref()
            .and_then(|raw| parse_time("end_time", raw, &mut problems));
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                problems.push("end_time must be after start_time".to_string());
            }
        }

        let location = self
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION)
            .to_string();

        match (title, date, start_time, end_time) {
            (Some(title), Some(date), Some(start_time), Some(end_time)) if problems.is_empty() => {
                Ok(ValidatedDetails {
                    title,
                    date,
                    start_time,
                    end_time,
                    attendees,
                    location,
                })
            }
            _ => Err(RecordError::validation(problems)),
        }
    }
}

fn required(value: &Option<String>, field: &str, problems: &mut Vec<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            problems.push(format!("missing field: {field}"));
            None
        }
    }
}

fn parse_time(field: &str, raw: &str, problems: &mut Vec<String>) -> Option<NaiveTime> {
    let parsed = NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"));
    match parsed {
        Ok(time) => Some(time),
        Err(_) => {
            problems.push(format!("malformed {field}: '{raw}' (expected HH:MM)"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn demo_details() -> MeetingDetails {
        MeetingDetails {
            title: Some("Demo".to_string()),
            date: Some("2024-02-01".to_string()),
            start_time: Some("10:00".to_string()),
            end_time: Some("11:00".to_string()),
            attendees: Some(vec!["a@x.com".to_string()]),
            location: None,
        }
    }

    #[test]
    fn validate_defaults_location_to_online() {
        let valid = demo_details().validate().unwrap();
        assert_eq!(valid.location, "Online");
        assert_eq!(valid.attendees, vec!["a@x.com".to_string()]);
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let err = MeetingDetails::default().validate().unwrap_err();
        assert_eq!(
            err.problems(),
            &[
                "missing field: title".to_string(),
                "missing field: date".to_string(),
                "missing field: start_time".to_string(),
                "missing field: end_time".to_string(),
                "missing field: attendees".to_string(),
            ]
        );
    }

    #[test]
    fn validate_rejects_malformed_values() {
        let mut details = demo_details();
        details.date = Some("01/02/2024".to_string());
        details.end_time = Some("09:00".to_string());
        let err = details.validate().unwrap_err();
        let problems = err.problems();
        assert!(problems.iter().any(|p| p.starts_with("malformed date")));
        assert!(problems.iter().any(|p| p == "end_time must be after start_time"));
    }

    #[test]
    fn meeting_date_alias_is_accepted() {
        let details: MeetingDetails = serde_json::from_str(
            r#"{"title":"Demo","start_time":"10:00","end_time":"11:00","attendees":["a@x.com"],"meeting_date":"2024-02-01"}"#,
        )
        .unwrap();
        assert_eq!(details.date.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MeetingStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
