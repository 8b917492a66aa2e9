use super::{notify, repair_once};
use crate::command::domain::{
    find_meeting_ids, parse_payload, CancelPayload, CommandError, CommandOutcome,
};
use crate::notifier::{MeetingEvent, Notifier};
use meeting_indexer::Catalog;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct CancelService {
    notifier: Arc<dyn Notifier>,
}

impl CancelService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn run(
        &self,
        payload: Value,
        catalog: &mut Catalog,
    ) -> Result<CommandOutcome, CommandError> {
        let payload: CancelPayload = parse_payload(payload)?;
        let Some(meeting_id) = resolve_meeting_id(&payload) else {
            return Err(CommandError::MeetingIdRequired {
                description: payload.description,
            });
        };

        // The store commits before the index, so after a repaired failure
        // only the prior status tells whether this call cancelled anything.
        let was_cancelled = catalog
            .get(&meeting_id)
            .is_some_and(|record| record.is_cancelled());
        let (record, changed) = match catalog.cancel(&meeting_id).await {
            Ok(outcome) => (outcome.record, outcome.changed),
            Err(err) => {
                let meeting_id = repair_once(catalog, err).await?;
                let record = catalog.get(&meeting_id).cloned().ok_or_else(|| {
                    CommandError::Internal(format!("Meeting {meeting_id} vanished after repair"))
                })?;
                (record, !was_cancelled)
            }
        };

        let mut hints = Vec::new();
        let message = if changed {
            log::info!("Cancelled {}", record.meeting_id);
            notify(
                self.notifier.as_ref(),
                MeetingEvent::Cancelled(&record),
                &mut hints,
            )
            .await;
            format!("Meeting {} has been cancelled.", record.meeting_id)
        } else {
            format!("Meeting {} was already cancelled.", record.meeting_id)
        };

        let mut outcome = CommandOutcome::new(message)
            .with_data(json!({ "meeting": record, "changed": changed }))?;
        outcome.hints = hints;
        Ok(outcome)
    }
}

/// Explicit id first, then the first id mentioned in the description
fn resolve_meeting_id(payload: &CancelPayload) -> Option<String> {
    payload
        .meeting_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_uppercase)
        .or_else(|| {
            payload
                .description
                .as_deref()
                .and_then(|text| find_meeting_ids(text).into_iter().next())
        })
}
