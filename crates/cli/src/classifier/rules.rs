use super::{parse_command_json, Classifier};
use crate::command::{find_meeting_ids, CommandAction, CommandRequest};
use crate::history::ConversationHistory;
use anyhow::Result;
use async_trait::async_trait;
use meeting_records::MeetingDetails;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static SCHEDULE_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:schedule|book|set\s+up|arrange|create|organi[sz]e)\b")
        .expect("Invalid regex")
});

static CANCEL_VERB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:cancel|call\s+off|delete|remove)\b").expect("Invalid regex"));

/// Questions about meetings mention the verbs without asking for the action
static QUESTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:what|which|when|where|who|whose|how|is|are|was|were|do|does|did|has|have|show|list|find)\b|\?\s*$",
    )
    .expect("Invalid regex")
});

/// "could you cancel M0001?" is still a request
static POLITE_REQUEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:please\b|(?:can|could|would|will)\s+you\b)").expect("Invalid regex")
});

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("Invalid regex"));

static TIME_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfrom\s+(\d{1,2}:\d{2})\s*(?:to|until|till|-)\s*(\d{1,2}:\d{2})\b")
        .expect("Invalid regex")
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\b").expect("Invalid regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("Invalid regex")
});

static WITH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bwith\s+(.+?)(?:\s+(?:on|at|in|from|to|for|about)\b|[.;]|$)")
        .expect("Invalid regex")
});

static LIST_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*,\s*(?:and\s+)?|\s+and\s+").expect("Invalid regex"));

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s(?:at|in)\s+([A-Za-z][^,.;]*?)(?:\s+(?:on|from|with|to|at|for)\b|[,.;]|$)")
        .expect("Invalid regex")
});

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]+)"|'([^']+)'|“([^”]+)”"#).expect("Invalid regex")
});

static NAMED_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:called|titled|named)\s+(.+?)(?:\s+(?:on|at|in|from|with|to|for)\b|[,.;]|$)")
        .expect("Invalid regex")
});

static VERB_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:schedule|book|set\s+up|arrange|create|organi[sz]e)\s+(?:(?:a|an|the|new|meeting|call)\s+)*(.+?)(?:\s+(?:on|at|in|from|with|to|for)\b|[,.;]|$)",
    )
    .expect("Invalid regex")
});

/// Words that never make a title on their own
const FILLER_WORDS: &[&str] = &["a", "an", "the", "meeting", "call", "new"];
const KEYWORDS: &[&str] = &["on", "at", "in", "from", "with", "to", "for"];

/// Keyword and regex intent detection; never calls out of process.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify_line(&self, text: &str) -> Result<CommandRequest> {
        if let Some(parsed) = parse_command_json(text) {
            return parsed;
        }
        let text = text.trim();

        let schedule_at = SCHEDULE_VERB_RE.find(text).map(|m| m.start());
        let cancel_at = CANCEL_VERB_RE.find(text).map(|m| m.start());
        let action = match (schedule_at, cancel_at) {
            _ if is_question(text) => CommandAction::Query,
            (Some(s), Some(c)) if c < s => CommandAction::Cancel,
            (Some(_), _) => CommandAction::Schedule,
            (None, Some(_)) => CommandAction::Cancel,
            (None, None) => CommandAction::Query,
        };
        log::debug!("Rule classifier picked {} for {text:?}", action.as_str());

        let request = match action {
            CommandAction::Schedule => {
                CommandRequest::new(action, serde_json::to_value(extract_details(text))?)
            }
            CommandAction::Cancel => CommandRequest::new(
                action,
                json!({
                    "meeting_id": find_meeting_ids(text).into_iter().next(),
                    "description": text,
                }),
            ),
            CommandAction::Query => CommandRequest::query(text),
        };
        Ok(request)
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn classify(
        &self,
        text: &str,
        _history: &ConversationHistory,
    ) -> Result<CommandRequest> {
        self.classify_line(text)
    }
}

fn is_question(text: &str) -> bool {
    QUESTION_RE.is_match(text) && !POLITE_REQUEST_RE.is_match(text)
}

/// Pull whatever meeting details the sentence mentions; validation reports
/// the rest.
pub fn extract_details(text: &str) -> MeetingDetails {
    let unquoted = QUOTED_RE.replace_all(text, " ");

    let (start_time, end_time) = match TIME_RANGE_RE.captures(&unquoted) {
        Some(caps) => (
            caps.get(1).map(|m| normalize_time(m.as_str())),
            caps.get(2).map(|m| normalize_time(m.as_str())),
        ),
        None => {
            let mut times = TIME_RE
                .captures_iter(&unquoted)
                .filter_map(|caps| caps.get(1).map(|m| normalize_time(m.as_str())));
            (times.next(), times.next())
        }
    };

    MeetingDetails {
        title: extract_title(text, &unquoted),
        date: DATE_RE
            .captures(&unquoted)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
        start_time,
        end_time,
        attendees: extract_attendees(&unquoted),
        location: LOCATION_RE
            .captures(&unquoted)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|location| !location.is_empty()),
    }
}

fn extract_title(text: &str, unquoted: &str) -> Option<String> {
    if let Some(caps) = QUOTED_RE.captures(text) {
        let quoted = caps
            .iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().trim().to_string());
        if quoted.as_deref().is_some_and(|t| !t.is_empty()) {
            return quoted;
        }
    }
    [&*NAMED_TITLE_RE, &*VERB_TITLE_RE]
        .into_iter()
        .filter_map(|re| re.captures(unquoted).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| is_plausible_title(candidate))
}

fn is_plausible_title(candidate: &str) -> bool {
    let Some(first) = candidate.split_whitespace().next() else {
        return false;
    };
    let first = first.to_lowercase();
    !KEYWORDS.contains(&first.as_str())
        && !first.starts_with(|c: char| c.is_ascii_digit())
        && !candidate
            .split_whitespace()
            .all(|word| FILLER_WORDS.contains(&word.to_lowercase().as_str()))
}

fn extract_attendees(text: &str) -> Option<Vec<String>> {
    let emails: Vec<String> = EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    if !emails.is_empty() {
        return Some(emails);
    }
    let list = WITH_RE.captures(text).and_then(|caps| caps.get(1))?;
    let names: Vec<String> = LIST_SEPARATOR_RE
        .split(list.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(names)
}

/// `9:00` becomes `09:00`
fn normalize_time(raw: &str) -> String {
    match raw.split_once(':') {
        Some((hours, minutes)) if hours.len() == 1 => format!("0{hours}:{minutes}"),
        _ => raw.to_string(),
    }
}
