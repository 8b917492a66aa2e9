mod cancel;
mod query;
mod schedule;

pub use query::{
    latest_per_meeting, render_hits, MeetingHit, QueryFilter, CANCELLED_NOTICE,
    NO_MATCHES_MESSAGE,
};

use crate::command::domain::{CommandAction, CommandError, CommandOutcome, Hint};
use crate::notifier::{MeetingEvent, Notifier};
use meeting_indexer::{Catalog, CatalogError};
use serde_json::Value;
use std::sync::Arc;

pub struct Services {
    schedule: schedule::ScheduleService,
    cancel: cancel::CancelService,
    query: query::QueryService,
}

impl Services {
    pub fn new(notifier: Arc<dyn Notifier>, query_limit: usize) -> Self {
        Self {
            schedule: schedule::ScheduleService::new(notifier.clone()),
            cancel: cancel::CancelService::new(notifier),
            query: query::QueryService::new(query_limit),
        }
    }

    pub fn with_query_filter(mut self, filter: QueryFilter) -> Self {
        self.query = self.query.with_filter(filter);
        self
    }

    pub async fn route(
        &self,
        action: CommandAction,
        payload: Value,
        catalog: &mut Catalog,
    ) -> Result<CommandOutcome, CommandError> {
        match action {
            CommandAction::Schedule => self.schedule.run(payload, catalog).await,
            CommandAction::Cancel => self.cancel.run(payload, catalog).await,
            CommandAction::Query => self.query.run(payload, catalog).await,
        }
    }
}

/// Retry the index step of a write that already committed to the record store.
///
/// Returns the meeting id when the retry succeeded, the original error otherwise.
async fn repair_once(catalog: &mut Catalog, err: CatalogError) -> Result<String, CatalogError> {
    let Some(meeting_id) = err.inconsistent_meeting().map(str::to_string) else {
        return Err(err);
    };
    log::warn!("{err}; retrying index update for {meeting_id}");
    match catalog.repair(&meeting_id).await {
        Ok(()) => Ok(meeting_id),
        Err(repair_err) => {
            log::error!("Index repair for {meeting_id} failed: {repair_err}");
            Err(err)
        }
    }
}

async fn notify(notifier: &dyn Notifier, event: MeetingEvent<'_>, hints: &mut Vec<Hint>) {
    match notifier.notify(event).await {
        Ok(reply) => hints.push(Hint::info(reply)),
        Err(err) => {
            log::warn!(
                "Notification for meeting {} failed: {err:#}",
                event.record().meeting_id
            );
            hints.push(Hint::warn("Attendees could not be notified."));
        }
    }
}
