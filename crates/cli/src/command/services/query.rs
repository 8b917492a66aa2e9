use crate::command::domain::{
    find_meeting_ids, parse_payload, CommandError, CommandOutcome, QueryPayload,
};
use meeting_indexer::Catalog;
use meeting_records::{record_from_metadata, render_text, MeetingRecord};
use meeting_vector_store::{shares_term, SearchResult};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const NO_MATCHES_MESSAGE: &str = "No matching meetings found.";
pub const CANCELLED_NOTICE: &str = "Notice: this meeting has been cancelled.";

/// Score given to meetings named by id in the query text
const EXACT_ID_SCORE: f32 = 1.0;

/// One meeting in a query answer
#[derive(Debug, Clone, Serialize)]
pub struct MeetingHit {
    pub meeting: MeetingRecord,
    pub score: f32,
}

/// Which similarity hits count as matches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryFilter {
    /// Hits must score strictly above this
    pub min_score: f32,
    /// Hits must share a content word with the query
    pub require_term_match: bool,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            require_term_match: true,
        }
    }
}

impl QueryFilter {
    pub fn accepts(&self, query: &str, hit: &MeetingHit) -> bool {
        if hit.score <= self.min_score {
            return false;
        }
        if !self.require_term_match {
            return true;
        }
        let haystack = format!(
            "{}\n{} {}",
            render_text(&hit.meeting),
            hit.meeting.time_span(),
            hit.meeting.status
        );
        shares_term(query, &haystack)
    }
}

pub struct QueryService {
    limit: usize,
    filter: QueryFilter,
}

impl QueryService {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            filter: QueryFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub async fn run(
        &self,
        payload: Value,
        catalog: &Catalog,
    ) -> Result<CommandOutcome, CommandError> {
        let payload: QueryPayload = parse_payload(payload)?;
        let text = payload.query.trim();
        if text.is_empty() {
            return Err(CommandError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        let limit = payload.limit.unwrap_or(self.limit).max(1);

        let results = catalog.query(text, limit).await?;
        let mut hits: Vec<MeetingHit> = latest_per_meeting(&results)
            .into_iter()
            .filter(|hit| self.filter.accepts(text, hit))
            .collect();

        // Meetings named by id come straight from the record store, ahead of
        // the similarity matches.
        let mut exact = Vec::new();
        for meeting_id in find_meeting_ids(text) {
            if let Some(record) = catalog.get(&meeting_id) {
                hits.retain(|hit| hit.meeting.meeting_id != meeting_id);
                exact.push(MeetingHit {
                    meeting: record.clone(),
                    score: EXACT_ID_SCORE,
                });
            }
        }
        exact.extend(hits);
        let hits = exact;

        log::debug!(
            "Query {text:?}: {} meetings from {} documents",
            hits.len(),
            results.len()
        );
        CommandOutcome::new(render_hits(&hits)).with_data(&hits)
    }
}

/// Collapse search results to one hit per meeting.
///
/// The document with the greatest `(updated_at, doc_id)` supplies the
/// meeting's state; the hit keeps the best score of all its documents.
/// Hits are ordered by score, then meeting id.
pub fn latest_per_meeting(results: &[SearchResult]) -> Vec<MeetingHit> {
    let mut best: HashMap<String, (MeetingHit, u64)> = HashMap::new();
    for result in results {
        let record = match record_from_metadata(&result.metadata) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("Skipping document {} with bad metadata: {err}", result.doc_id);
                continue;
            }
        };
        match best.get_mut(&record.meeting_id) {
            Some((hit, doc_id)) => {
                hit.score = hit.score.max(result.score);
                if (record.updated_at, result.doc_id) > (hit.meeting.updated_at, *doc_id) {
                    hit.meeting = record;
                    *doc_id = result.doc_id;
                }
            }
            None => {
                let hit = MeetingHit {
                    meeting: record,
                    score: result.score,
                };
                best.insert(hit.meeting.meeting_id.clone(), (hit, result.doc_id));
            }
        }
    }

    let mut hits: Vec<MeetingHit> = best.into_values().map(|(hit, _)| hit).collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.meeting.meeting_id.cmp(&b.meeting.meeting_id))
    });
    hits
}

pub fn render_hits(hits: &[MeetingHit]) -> String {
    if hits.is_empty() {
        return NO_MATCHES_MESSAGE.to_string();
    }
    let header = if hits.len() == 1 {
        "I found 1 matching meeting:".to_string()
    } else {
        format!("I found {} matching meetings:", hits.len())
    };
    let blocks: Vec<String> = hits.iter().map(|hit| render_meeting(&hit.meeting)).collect();
    format!("{header}\n\n{}", blocks.join("\n\n"))
}

fn render_meeting(record: &MeetingRecord) -> String {
    let mut block = format!(
        "Meeting ID: {}\nTitle: {}\nDate: {}\nTime: {}\nLocation: {}\nAttendees: {}\nStatus: {}",
        record.meeting_id,
        record.title,
        record.date,
        record.time_span(),
        record.location,
        record.attendees.join(", "),
        record.status
    );
    if record.is_cancelled() {
        block.push('\n');
        block.push_str(CANCELLED_NOTICE);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_records::{project, MeetingStatus};
    use pretty_assertions::assert_eq;

    fn record(id: &str, status: MeetingStatus, updated_at: u64) -> MeetingRecord {
        MeetingRecord {
            meeting_id: id.to_string(),
            title: "Standup".to_string(),
            date: "2024-01-10".to_string(),
            start_time: "09:00".to_string(),
            end_time: "09:15".to_string(),
            location: "Room 4".to_string(),
            attendees: vec!["ana@x.com".to_string(), "bo@x.com".to_string()],
            status,
            updated_at,
        }
    }

    fn result(doc_id: u64, record: &MeetingRecord, score: f32) -> SearchResult {
        let (text, metadata) = project(record);
        SearchResult {
            doc_id,
            text,
            metadata,
            score,
        }
    }

    #[test]
    fn most_recent_write_wins_regardless_of_score() {
        let old = record("M0001", MeetingStatus::Scheduled, 10);
        let new = record("M0001", MeetingStatus::Cancelled, 20);
        let hits = latest_per_meeting(&[result(1, &old, 0.9), result(2, &new, 0.4)]);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meeting.status, MeetingStatus::Cancelled);
        assert_eq!(hits[0].score, 0.9);
    }

    #[test]
    fn equal_timestamps_fall_back_to_doc_id() {
        let first = record("M0001", MeetingStatus::Scheduled, 0);
        let second = record("M0001", MeetingStatus::Cancelled, 0);
        let hits = latest_per_meeting(&[result(7, &second, 0.2), result(3, &first, 0.8)]);
        assert_eq!(hits[0].meeting.status, MeetingStatus::Cancelled);
    }

    #[test]
    fn hits_are_ordered_by_score_then_id() {
        let a = record("M0002", MeetingStatus::Scheduled, 0);
        let b = record("M0001", MeetingStatus::Scheduled, 0);
        let c = record("M0003", MeetingStatus::Scheduled, 0);
        let hits = latest_per_meeting(&[
            result(1, &a, 0.5),
            result(2, &b, 0.5),
            result(3, &c, 0.7),
        ]);
        let ids: Vec<&str> = hits.iter().map(|h| h.meeting.meeting_id.as_str()).collect();
        assert_eq!(ids, vec!["M0003", "M0001", "M0002"]);
    }

    #[test]
    fn bad_metadata_is_skipped() {
        let good = record("M0001", MeetingStatus::Scheduled, 0);
        let bad = SearchResult {
            doc_id: 9,
            text: "orphan".to_string(),
            metadata: serde_json::json!({ "meeting_id": "M0009" }),
            score: 0.99,
        };
        let hits = latest_per_meeting(&[bad, result(1, &good, 0.1)]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meeting.meeting_id, "M0001");
    }

    #[test]
    fn cancelled_meetings_carry_a_notice() {
        let hits = vec![
            MeetingHit {
                meeting: record("M0001", MeetingStatus::Cancelled, 0),
                score: 0.5,
            },
            MeetingHit {
                meeting: record("M0002", MeetingStatus::Scheduled, 0),
                score: 0.4,
            },
        ];
        let text = render_hits(&hits);
        assert!(text.starts_with("I found 2 matching meetings:"));
        assert_eq!(text.matches(CANCELLED_NOTICE).count(), 1);
        assert!(text.contains("Time: 09:00-09:15"));
        assert!(text.contains("Attendees: ana@x.com, bo@x.com"));
        assert!(text.contains("Status: scheduled"));
    }

    #[test]
    fn filter_drops_hits_without_a_shared_word() {
        let hit = MeetingHit {
            meeting: record("M0001", MeetingStatus::Scheduled, 0),
            score: 0.11,
        };
        let filter = QueryFilter::default();
        assert!(filter.accepts("standup", &hit));
        assert!(filter.accepts("meetings with bo", &hit));
        assert!(!filter.accepts("zebra", &hit));
        assert!(!filter.accepts("demo", &hit));

        let lexical_off = QueryFilter {
            min_score: 0.0,
            require_term_match: false,
        };
        assert!(lexical_off.accepts("zebra", &hit));
        let strict = QueryFilter {
            min_score: 0.2,
            require_term_match: false,
        };
        assert!(!strict.accepts("standup", &hit));
    }

    #[test]
    fn status_words_match_the_current_state() {
        let hit = MeetingHit {
            meeting: record("M0001", MeetingStatus::Cancelled, 0),
            score: 0.3,
        };
        assert!(QueryFilter::default().accepts("cancelled meetings", &hit));
    }

    #[test]
    fn empty_hits_render_the_no_match_message() {
        assert_eq!(render_hits(&[]), NO_MATCHES_MESSAGE);
    }
}
