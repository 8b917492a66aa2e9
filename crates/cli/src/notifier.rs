use anyhow::Result;
use async_trait::async_trait;
use meeting_records::MeetingRecord;

pub const NOTIFICATION_SENT: &str = "Notification sent successfully";

#[derive(Debug, Clone, Copy)]
pub enum MeetingEvent<'a> {
    Scheduled(&'a MeetingRecord),
    Cancelled(&'a MeetingRecord),
}

impl<'a> MeetingEvent<'a> {
    pub fn record(&self) -> &'a MeetingRecord {
        match self {
            MeetingEvent::Scheduled(record) | MeetingEvent::Cancelled(record) => record,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            MeetingEvent::Scheduled(_) => "scheduled",
            MeetingEvent::Cancelled(_) => "cancelled",
        }
    }
}

/// Delivers meeting notifications to attendees.
///
/// A failed notification never fails the command that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: MeetingEvent<'_>) -> Result<String>;
}

/// Writes the notification to the log instead of delivering it
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: MeetingEvent<'_>) -> Result<String> {
        let record = event.record();
        log::info!(
            "Notify {} about {} meeting {} ({} on {} {})",
            record.attendees.join(", "),
            event.kind(),
            record.meeting_id,
            record.title,
            record.date,
            record.time_span()
        );
        Ok(NOTIFICATION_SENT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_records::MeetingStatus;

    #[tokio::test]
    async fn log_notifier_reports_success() {
        let record = MeetingRecord {
            meeting_id: "M0001".to_string(),
            title: "Standup".to_string(),
            date: "2024-01-10".to_string(),
            start_time: "09:00".to_string(),
            end_time: "09:15".to_string(),
            location: "Room 4".to_string(),
            attendees: vec!["ana@x.com".to_string()],
            status: MeetingStatus::Scheduled,
            updated_at: 0,
        };
        let reply = LogNotifier
            .notify(MeetingEvent::Scheduled(&record))
            .await
            .expect("notify");
        assert_eq!(reply, NOTIFICATION_SENT);
    }
}
