use meeting_indexer::CatalogError;
use meeting_records::{MeetingDetails, RecordError};
use meeting_vector_store::VectorStoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const SCHEDULE_FAILED_MESSAGE: &str =
    "Sorry, I couldn't schedule the meeting. Please try again.";
pub const CANCEL_FAILED_MESSAGE: &str = "Sorry, I couldn't cancel the meeting. Please try again.";
pub const QUERY_FAILED_MESSAGE: &str = "Sorry, I couldn't search the meetings. Please try again.";
pub const MEETING_ID_REQUIRED_MESSAGE: &str =
    "I need a meeting ID to cancel a meeting. Let me look for meetings matching your description.";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

impl CommandRequest {
    pub fn new(action: CommandAction, payload: Value) -> Self {
        Self { action, payload }
    }

    pub fn query(text: impl Into<String>) -> Self {
        Self::new(CommandAction::Query, json!({ "query": text.into() }))
    }
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Schedule,
    Cancel,
    Query,
}

impl CommandAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Schedule => "schedule",
            CommandAction::Cancel => "cancel",
            CommandAction::Query => "query",
        }
    }
}

pub type SchedulePayload = MeetingDetails;

#[derive(Debug, Deserialize, Default)]
pub struct CancelPayload {
    #[serde(default)]
    pub meeting_id: Option<String>,
    /// Free text used to look the meeting up when no id is given
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryPayload {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CommandResponse {
    pub status: CommandStatus,
    /// Text shown to the user
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<NextAction>,
    #[serde(default)]
    pub data: Value,
}

impl CommandResponse {
    pub fn is_error(&self) -> bool {
        matches!(self.status, CommandStatus::Error)
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    IndexError,
    Inconsistency,
    InvalidRequest,
    Internal,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::IndexError => "index_error",
            ErrorCode::Inconsistency => "inconsistency",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    /// Underlying error, for logs and machine consumers
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Hint {
    #[serde(rename = "type")]
    pub kind: HintKind,
    pub text: String,
}

impl Hint {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Info,
            text: text.into(),
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Warn,
            text: text.into(),
        }
    }

    pub fn action(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Action,
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Info,
    Action,
    Warn,
}

/// Follow-up command the caller may run next
#[derive(Debug, Serialize, Clone)]
pub struct NextAction {
    pub action: CommandAction,
    pub payload: Value,
    pub reason: String,
}

impl NextAction {
    pub fn to_request(&self) -> CommandRequest {
        CommandRequest::new(self.action, self.payload.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    pub message: String,
    pub data: Value,
    pub hints: Vec<Hint>,
    pub next_actions: Vec<NextAction>,
}

impl CommandOutcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_data<T: Serialize>(mut self, value: T) -> Result<Self, CommandError> {
        self.data = serde_json::to_value(value)
            .map_err(|err| CommandError::Internal(format!("Failed to encode response: {err}")))?;
        Ok(self)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Meeting ID required")]
    MeetingIdRequired { description: Option<String> },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    Internal(String),
}

static MEETING_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bM\d{4}\b").expect("Invalid regex"));

/// Meeting ids mentioned in free text, upper-cased, in order of appearance
pub fn find_meeting_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for found in MEETING_ID_RE.find_iter(text) {
        let id = found.as_str().to_uppercase();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, CommandError> {
    serde_json::from_value(payload).map_err(|err| CommandError::InvalidRequest(err.to_string()))
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub code: ErrorCode,
    /// User-facing text
    pub message: String,
    pub hint: Option<String>,
    pub hints: Vec<Hint>,
    pub next_actions: Vec<NextAction>,
}

impl ErrorClassification {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
            hints: Vec::new(),
            next_actions: Vec::new(),
        }
    }

    fn with_hint(mut self, kind: HintKind, text: impl Into<String>) -> Self {
        let text = text.into();
        self.hint = Some(text.clone());
        self.hints.push(Hint { kind, text });
        self
    }
}

/// Map a command failure to an error code, user-facing text and hints.
pub fn classify_error(err: &CommandError, action: CommandAction) -> ErrorClassification {
    match err {
        CommandError::InvalidRequest(_) => {
            ErrorClassification::new(ErrorCode::InvalidRequest, generic_failure(action))
                .with_hint(HintKind::Action, "Rephrase the request and try again.")
        }
        CommandError::MeetingIdRequired { description } => {
            let mut classification =
                ErrorClassification::new(ErrorCode::InvalidRequest, MEETING_ID_REQUIRED_MESSAGE)
                    .with_hint(
                        HintKind::Action,
                        "Include the meeting ID (for example M0001) in the cancel request.",
                    );
            if let Some(description) = description.as_deref().filter(|d| !d.trim().is_empty()) {
                classification.next_actions.push(NextAction {
                    action: CommandAction::Query,
                    payload: json!({ "query": description }),
                    reason: "Find the meeting ID matching the description.".to_string(),
                });
            }
            classification
        }
        CommandError::Catalog(err) => classify_catalog_error(err, action),
        CommandError::Internal(_) => {
            ErrorClassification::new(ErrorCode::Internal, generic_failure(action))
        }
    }
}

fn classify_catalog_error(err: &CatalogError, action: CommandAction) -> ErrorClassification {
    match err {
        CatalogError::Record(RecordError::Validation { problems }) => {
            let message = format!(
                "I couldn't schedule the meeting: {}.",
                problems.join("; ")
            );
            ErrorClassification::new(ErrorCode::ValidationError, message).with_hint(
                HintKind::Action,
                "Provide a title, a date (YYYY-MM-DD), start and end times (HH:MM) and at least one attendee.",
            )
        }
        CatalogError::Record(RecordError::NotFound(meeting_id)) => {
            let mut classification = ErrorClassification::new(
                ErrorCode::NotFound,
                format!("No meeting found with ID: {meeting_id}"),
            )
            .with_hint(HintKind::Action, "Search for the meeting to find its ID.");
            classification.next_actions.push(NextAction {
                action: CommandAction::Query,
                payload: json!({ "query": meeting_id }),
                reason: "List meetings to find the right ID.".to_string(),
            });
            classification
        }
        CatalogError::Inconsistency { meeting_id, .. } => ErrorClassification::new(
            ErrorCode::Inconsistency,
            format!(
                "Meeting {meeting_id} was saved, but the search index could not be updated. Please try again shortly."
            ),
        )
        .with_hint(
            HintKind::Warn,
            "The index is repaired automatically on the next start.",
        ),
        CatalogError::Index(index_err) => {
            let classification =
                ErrorClassification::new(ErrorCode::IndexError, generic_failure(action));
            if matches!(
                index_err,
                VectorStoreError::EmbeddingError(_) | VectorStoreError::EmbeddingTimeout(_)
            ) {
                classification.with_hint(
                    HintKind::Warn,
                    "The embedding backend is unavailable; check that it is running.",
                )
            } else {
                classification
            }
        }
        _ => ErrorClassification::new(ErrorCode::Internal, generic_failure(action)),
    }
}

fn generic_failure(action: CommandAction) -> &'static str {
    match action {
        CommandAction::Schedule => SCHEDULE_FAILED_MESSAGE,
        CommandAction::Cancel => CANCEL_FAILED_MESSAGE,
        CommandAction::Query => QUERY_FAILED_MESSAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_parses_with_default_payload() {
        let request: CommandRequest =
            serde_json::from_str(r#"{"action":"query"}"#).expect("parse");
        assert_eq!(request.action, CommandAction::Query);
        assert_eq!(request.payload, json!({}));
    }

    #[test]
    fn meeting_ids_are_found_once_and_upper_cased() {
        assert_eq!(
            find_meeting_ids("cancel m0002, not M0001 or M0002 or M12345"),
            vec!["M0002".to_string(), "M0001".to_string()]
        );
    }

    #[test]
    fn validation_error_lists_problems() {
        let err = CommandError::from(CatalogError::Record(RecordError::validation(vec![
            "missing field: attendees".to_string(),
        ])));
        let classification = classify_error(&err, CommandAction::Schedule);
        assert_eq!(classification.code, ErrorCode::ValidationError);
        assert!(classification.message.contains("missing field: attendees"));
    }

    #[test]
    fn not_found_suggests_a_query() {
        let err = CommandError::from(CatalogError::Record(RecordError::not_found("M9999")));
        let classification = classify_error(&err, CommandAction::Cancel);
        assert_eq!(classification.code, ErrorCode::NotFound);
        assert_eq!(classification.message, "No meeting found with ID: M9999");
        assert_eq!(classification.next_actions.len(), 1);
        assert_eq!(classification.next_actions[0].action, CommandAction::Query);
    }

    #[test]
    fn index_failures_use_the_generic_message_per_action() {
        let err = CommandError::from(CatalogError::Index(VectorStoreError::EmbeddingTimeout(
            10_000,
        )));
        let classification = classify_error(&err, CommandAction::Schedule);
        assert_eq!(classification.code, ErrorCode::IndexError);
        assert_eq!(classification.message, SCHEDULE_FAILED_MESSAGE);
        assert!(classification.hint.is_some());
    }

    #[test]
    fn missing_id_without_description_has_no_follow_up() {
        let err = CommandError::MeetingIdRequired { description: None };
        let classification = classify_error(&err, CommandAction::Cancel);
        assert_eq!(classification.code, ErrorCode::InvalidRequest);
        assert!(classification.next_actions.is_empty());
    }
}
