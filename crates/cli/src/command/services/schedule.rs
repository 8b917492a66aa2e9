use super::{notify, repair_once};
use crate::command::domain::{parse_payload, CommandError, CommandOutcome, SchedulePayload};
use crate::notifier::{MeetingEvent, Notifier};
use meeting_indexer::Catalog;
use serde_json::Value;
use std::sync::Arc;

pub struct ScheduleService {
    notifier: Arc<dyn Notifier>,
}

impl ScheduleService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn run(
        &self,
        payload: Value,
        catalog: &mut Catalog,
    ) -> Result<CommandOutcome, CommandError> {
        let details: SchedulePayload = parse_payload(payload)?;
        let record = match catalog.schedule(details).await {
            Ok(record) => record,
            Err(err) => {
                let meeting_id = repair_once(catalog, err).await?;
                catalog.get(&meeting_id).cloned().ok_or_else(|| {
                    CommandError::Internal(format!("Meeting {meeting_id} vanished after repair"))
                })?
            }
        };
        log::info!("Scheduled {} ({})", record.meeting_id, record.title);

        let mut hints = Vec::new();
        notify(
            self.notifier.as_ref(),
            MeetingEvent::Scheduled(&record),
            &mut hints,
        )
        .await;

        let mut outcome = CommandOutcome::new(format!(
            "Meeting scheduled successfully with ID: {}",
            record.meeting_id
        ))
        .with_data(&record)?;
        outcome.hints = hints;
        Ok(outcome)
    }
}
