pub mod domain;
mod services;

pub use domain::{
    classify_error, find_meeting_ids, parse_payload, CancelPayload, CommandAction, CommandError,
    CommandOutcome, CommandRequest, CommandResponse, CommandStatus, ErrorClassification,
    ErrorCode, ErrorEnvelope, Hint, HintKind, NextAction, QueryPayload, SchedulePayload,
    CANCEL_FAILED_MESSAGE, MEETING_ID_REQUIRED_MESSAGE, QUERY_FAILED_MESSAGE,
    SCHEDULE_FAILED_MESSAGE,
};
pub use services::{
    latest_per_meeting, render_hits, MeetingHit, QueryFilter, CANCELLED_NOTICE,
    NO_MATCHES_MESSAGE,
};

use crate::notifier::Notifier;
use meeting_indexer::Catalog;
use services::Services;
use std::sync::Arc;
use std::time::Instant;

/// Routes classified commands to the catalog and shapes the response.
pub struct CommandHandler {
    catalog: Catalog,
    services: Services,
}

impl CommandHandler {
    pub fn new(catalog: Catalog, notifier: Arc<dyn Notifier>, query_limit: usize) -> Self {
        Self {
            catalog,
            services: Services::new(notifier, query_limit),
        }
    }

    pub fn with_query_filter(mut self, filter: QueryFilter) -> Self {
        self.services = self.services.with_query_filter(filter);
        self
    }

    pub async fn execute(&mut self, request: CommandRequest) -> CommandResponse {
        let started = Instant::now();
        let CommandRequest { action, payload } = request;

        let outcome = self
            .services
            .route(action, payload, &mut self.catalog)
            .await;

        let response = match outcome {
            Ok(outcome) => CommandResponse {
                status: CommandStatus::Ok,
                message: outcome.message,
                error: None,
                hints: outcome.hints,
                next_actions: outcome.next_actions,
                data: outcome.data,
            },
            Err(err) => error_response(&err, action),
        };

        log::debug!(
            "{} finished in {} ms ({:?})",
            action.as_str(),
            started.elapsed().as_millis(),
            response.status
        );
        response
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }
}

fn error_response(err: &CommandError, action: CommandAction) -> CommandResponse {
    let classification = classify_error(err, action);
    match classification.code {
        ErrorCode::ValidationError | ErrorCode::NotFound | ErrorCode::InvalidRequest => {
            log::info!("{} rejected: {err}", action.as_str());
        }
        _ => log::error!("{} failed: {err:#}", action.as_str()),
    }

    let error = ErrorEnvelope {
        code: classification.code,
        message: err.to_string(),
        hint: classification.hint,
    };
    CommandResponse {
        status: CommandStatus::Error,
        message: classification.message,
        error: Some(error),
        hints: classification.hints,
        next_actions: classification.next_actions,
        data: serde_json::Value::Null,
    }
}
