use crate::error::{RecordError, Result};
use crate::ids::MeetingIdGenerator;
use crate::types::{MeetingDetails, MeetingRecord, MeetingStatus};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Canonical meeting records, persisted as a JSON array.
pub struct RecordStore {
    path: PathBuf,
    records: BTreeMap<String, MeetingRecord>,
    ids: MeetingIdGenerator,
    last_stamp: u64,
}

impl RecordStore {
    /// Open the store at `path`; a missing file yields an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if tokio::fs::try_exists(&path).await? {
            let bytes = tokio::fs::read(&path).await?;
            let list: Vec<MeetingRecord> = serde_json::from_slice(&bytes)?;
            list.into_iter()
                .map(|r| (r.meeting_id.clone(), r))
                .collect::<BTreeMap<_, _>>()
        } else {
            BTreeMap::new()
        };
        log::info!("Opened record store at {:?} ({} records)", path, records.len());

        let last_stamp = records.values().map(|r| r.updated_at).max().unwrap_or(0);
        Ok(Self {
            path,
            records,
            ids: MeetingIdGenerator::new(),
            last_stamp,
        })
    }

    /// Replace the id generator (deterministic ids in tests)
    pub fn with_id_generator(mut self, ids: MeetingIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `details`, assign a fresh id and persist a scheduled record.
    pub async fn create(&mut self, details: MeetingDetails) -> Result<String> {
        let valid = details.validate()?;
        let meeting_id = self.ids.generate(|c| self.records.contains_key(c))?;
        let record = MeetingRecord {
            meeting_id: meeting_id.clone(),
            title: valid.title,
            date: valid.date,
            start_time: valid.start_time,
            end_time: valid.end_time,
            location: valid.location,
            attendees: valid.attendees,
            status: MeetingStatus::Scheduled,
            updated_at: self.next_stamp(),
        };

        self.records.insert(meeting_id.clone(), record);
        if let Err(err) = self.save().await {
            self.records.remove(&meeting_id);
            return Err(err);
        }
        log::info!("Created meeting {meeting_id}");
        Ok(meeting_id)
    }

    /// Mark a meeting cancelled.
    ///
    /// Returns `true` when the status changed and `false` when the meeting
    /// was already cancelled (nothing is written in that case).
    pub async fn cancel(&mut self, meeting_id: &str) -> Result<bool> {
        let stamp = self.next_stamp();
        let record = self
            .records
            .get_mut(meeting_id)
            .ok_or_else(|| RecordError::not_found(meeting_id))?;
        if record.is_cancelled() {
            return Ok(false);
        }

        let previous = (record.status, record.updated_at);
        record.status = MeetingStatus::Cancelled;
        record.updated_at = stamp;

        if let Err(err) = self.save().await {
            if let Some(record) = self.records.get_mut(meeting_id) {
                (record.status, record.updated_at) = previous;
            }
            return Err(err);
        }
        log::info!("Cancelled meeting {meeting_id}");
        Ok(true)
    }

    pub fn get(&self, meeting_id: &str) -> Option<&MeetingRecord> {
        self.records.get(meeting_id)
    }

    pub fn contains(&self, meeting_id: &str) -> bool {
        self.records.contains_key(meeting_id)
    }

    /// Add complete records (seed data) in one write. Duplicate ids are rejected.
    pub async fn insert_many(&mut self, records: Vec<MeetingRecord>) -> Result<usize> {
        let mut seen = std::collections::HashSet::new();
        for record in &records {
            if self.records.contains_key(&record.meeting_id) || !seen.insert(&record.meeting_id) {
                return Err(RecordError::Duplicate(record.meeting_id.clone()));
            }
        }

        let count = records.len();
        let ids: Vec<String> = records.iter().map(|r| r.meeting_id.clone()).collect();
        for record in records {
            self.last_stamp = self.last_stamp.max(record.updated_at);
            self.records.insert(record.meeting_id.clone(), record);
        }
        if let Err(err) = self.save().await {
            for id in &ids {
                self.records.remove(id);
            }
            return Err(err);
        }
        Ok(count)
    }

    pub async fn insert(&mut self, record: MeetingRecord) -> Result<()> {
        self.insert_many(vec![record]).await.map(|_| ())
    }

    /// Records in meeting id order
    pub fn list(&self) -> impl Iterator<Item = &MeetingRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let list: Vec<&MeetingRecord> = self.records.values().collect();
        let bytes = serde_json::to_vec_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Strictly increasing write stamp, anchored to wall-clock milliseconds
    fn next_stamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn demo() -> MeetingDetails {
        MeetingDetails {
            title: Some("Demo".to_string()),
            date: Some("2024-02-01".to_string()),
            start_time: Some("10:00".to_string()),
            end_time: Some("11:00".to_string()),
            attendees: Some(vec!["a@x.com".to_string()]),
            location: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults() {
        let temp = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp.path().join("records.json"))
            .await
            .unwrap();

        let id = store.create(demo()).await.unwrap();
        assert!(crate::is_meeting_id(&id));

        let record = store.get(&id).unwrap();
        assert_eq!(record.location, "Online");
        assert_eq!(record.status, MeetingStatus::Scheduled);
        assert!(record.updated_at > 0);
    }

    #[tokio::test]
    async fn invalid_details_leave_store_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        let mut store = RecordStore::open(&path).await.unwrap();

        let mut details = demo();
        details.attendees = None;
        let err = store.create(details).await.unwrap_err();
        assert!(matches!(err, RecordError::Validation { .. }));
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_bumps_stamp_once() {
        let temp = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp.path().join("records.json"))
            .await
            .unwrap();
        let id = store.create(demo()).await.unwrap();
        let created_at = store.get(&id).unwrap().updated_at;

        assert!(store.cancel(&id).await.unwrap());
        let cancelled_at = store.get(&id).unwrap().updated_at;
        assert!(cancelled_at > created_at);

        assert!(!store.cancel(&id).await.unwrap());
        let record = store.get(&id).unwrap();
        assert_eq!(record.status, MeetingStatus::Cancelled);
        assert_eq!(record.updated_at, cancelled_at);
    }

    #[tokio::test]
    async fn cancel_unknown_id_is_not_found() {
        let temp = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp.path().join("records.json"))
            .await
            .unwrap();
        let err = store.cancel("M4242").await.unwrap_err();
        assert!(matches!(err, RecordError::NotFound(id) if id == "M4242"));
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        let id = {
            let mut store = RecordStore::open(&path).await.unwrap();
            let id = store.create(demo()).await.unwrap();
            store.cancel(&id).await.unwrap();
            id
        };

        let store = RecordStore::open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn insert_many_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp.path().join("records.json"))
            .await
            .unwrap();
        let id = store.create(demo()).await.unwrap();
        let existing = store.get(&id).unwrap().clone();

        let err = store.insert_many(vec![existing]).await.unwrap_err();
        assert!(matches!(err, RecordError::Duplicate(dup) if dup == id));
        assert_eq!(store.len(), 1);
    }
}
