use crate::index_lock::{acquire_catalog_lock, CatalogLock};
use crate::stats::{BootstrapReport, IndexSource};
use crate::{CatalogError, Result};
use meeting_records::{
    load_seed_file, metadata, project, MeetingDetails, MeetingRecord, RecordStore,
};
use meeting_vector_store::{
    index_dir, records_path, Embedder, SearchResult, VectorStore, VectorStoreError,
    DEFAULT_EMBED_TIMEOUT,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub data_dir: PathBuf,
    /// Loaded once, only into an empty record store
    pub seed_file: Option<PathBuf>,
    pub embed_timeout: Duration,
}

impl CatalogOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            seed_file: None,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_seed_file(mut self, seed_file: impl Into<PathBuf>) -> Self {
        self.seed_file = Some(seed_file.into());
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub record: MeetingRecord,
    /// False when the meeting was already cancelled
    pub changed: bool,
}

/// Record store and semantic index, updated write-through.
///
/// Every mutation commits to the record store first and then replaces the
/// meeting's document in the index. A failure in the second step surfaces as
/// [`CatalogError::Inconsistency`]; [`Catalog::repair`] retries it.
pub struct Catalog {
    data_dir: PathBuf,
    records: RecordStore,
    index: VectorStore,
    _lock: CatalogLock,
}

impl Catalog {
    /// Lock the data dir, seed an empty store, then load or build the index.
    pub async fn open(
        options: CatalogOptions,
        embedder: Arc<dyn Embedder>,
    ) -> Result<(Self, BootstrapReport)> {
        let started = Instant::now();
        let data_dir = options.data_dir.clone();
        let lock = acquire_catalog_lock(&data_dir).await?;

        let mut records = RecordStore::open(records_path(&data_dir)).await?;
        let seeded = match &options.seed_file {
            Some(seed) if records.is_empty() => seed_records(&mut records, seed).await?,
            _ => 0,
        };

        let dir = index_dir(&data_dir);
        let (index, source) = if VectorStore::exists(&dir) {
            match VectorStore::load(&dir, embedder.clone()).await {
                Ok(index) => {
                    let documents = index.len();
                    (index, IndexSource::Loaded { documents })
                }
                Err(err) => {
                    log::warn!("Persisted index at {:?} is unusable ({err}); rebuilding", dir);
                    let index = build_index(&dir, embedder, &records, options.embed_timeout).await?;
                    let documents = index.len();
                    (
                        index,
                        IndexSource::Rebuilt {
                            documents,
                            reason: err.to_string(),
                        },
                    )
                }
            }
        } else {
            let index = build_index(&dir, embedder, &records, options.embed_timeout).await?;
            let documents = index.len();
            (index, IndexSource::Built { documents })
        };

        let mut catalog = Self {
            data_dir,
            records,
            index: index.with_embed_timeout(options.embed_timeout),
            _lock: lock,
        };
        let (repaired, stale) = catalog.reconcile().await;

        let report = BootstrapReport {
            seeded,
            records: catalog.records.len(),
            index: source,
            repaired,
            stale,
            time_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "Catalog ready: {} records, index {:?}, {} repaired, {} stale",
            report.records,
            report.index,
            report.repaired,
            report.stale
        );
        Ok((catalog, report))
    }

    /// Create a scheduled meeting and index it.
    pub async fn schedule(&mut self, details: MeetingDetails) -> Result<MeetingRecord> {
        let meeting_id = self.records.create(details).await?;
        let record = self.record(&meeting_id)?;
        self.sync_index(&record)
            .await
            .map_err(|source| CatalogError::Inconsistency {
                meeting_id: meeting_id.clone(),
                source,
            })?;
        Ok(record)
    }

    /// Cancel a meeting and replace its indexed document.
    ///
    /// Cancelling twice succeeds; the second call only re-indexes when the
    /// index is stale.
    pub async fn cancel(&mut self, meeting_id: &str) -> Result<CancelOutcome> {
        let changed = self.records.cancel(meeting_id).await?;
        let record = self.record(meeting_id)?;
        if changed || !self.index_reflects(&record) {
            self.sync_index(&record)
                .await
                .map_err(|source| CatalogError::Inconsistency {
                    meeting_id: meeting_id.to_string(),
                    source,
                })?;
        }
        Ok(CancelOutcome { record, changed })
    }

    pub async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>> {
        Ok(self.index.query(text, limit).await?)
    }

    pub fn get(&self, meeting_id: &str) -> Option<&MeetingRecord> {
        self.records.get(meeting_id)
    }

    /// Re-project a record and replace its indexed document.
    pub async fn repair(&mut self, meeting_id: &str) -> Result<()> {
        let record = self.record(meeting_id)?;
        self.sync_index(&record).await?;
        log::info!("Repaired index entry for {meeting_id}");
        Ok(())
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn index(&self) -> &VectorStore {
        &self.index
    }

    /// Direct index access, bypassing write-through
    pub fn index_mut(&mut self) -> &mut VectorStore {
        &mut self.index
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn record(&self, meeting_id: &str) -> Result<MeetingRecord> {
        self.records
            .get(meeting_id)
            .cloned()
            .ok_or_else(|| meeting_records::RecordError::not_found(meeting_id).into())
    }

    async fn sync_index(&mut self, record: &MeetingRecord) -> std::result::Result<(), VectorStoreError> {
        let (text, meta) = project(record);
        self.index.upsert(&record.meeting_id, text, meta).await?;
        self.index.save().await
    }

    /// True when the index holds exactly one document matching the record
    fn index_reflects(&self, record: &MeetingRecord) -> bool {
        let docs = self.index.documents_for_key(&record.meeting_id);
        docs.len() == 1 && docs[0].metadata == metadata(record)
    }

    /// Re-index records whose documents are missing or stale and drop documents
    /// for meetings the store does not know.
    /// Returns `(repaired, still_stale)`. Records that cannot be re-embedded
    /// stay stale until a later `repair`; the store remains authoritative.
    async fn reconcile(&mut self) -> (usize, usize) {
        let stale: Vec<MeetingRecord> = self
            .records
            .list()
            .filter(|record| !self.index_reflects(record))
            .cloned()
            .collect();
        let orphans: BTreeSet<String> = self
            .index
            .documents()
            .filter_map(|doc| doc.key())
            .filter(|key| !self.records.contains(key))
            .map(str::to_string)
            .collect();

        for key in &orphans {
            log::warn!("Dropping index entries for unknown meeting {key}");
            self.index.remove_key(key);
        }
        let mut repaired = 0;
        for record in &stale {
            log::warn!("Index entry for {} is stale; re-indexing", record.meeting_id);
            let (text, meta) = project(record);
            match self.index.upsert(&record.meeting_id, text, meta).await {
                Ok(_) => repaired += 1,
                Err(err) => log::warn!(
                    "Could not re-index {} ({err}); leaving it for repair",
                    record.meeting_id
                ),
            }
        }
        if repaired > 0 || !orphans.is_empty() {
            if let Err(err) = self.index.save().await {
                log::warn!("Failed to save reconciled index: {err}");
            }
        }
        (repaired, stale.len() - repaired)
    }
}

async fn seed_records(records: &mut RecordStore, seed: &Path) -> Result<usize> {
    if !tokio::fs::try_exists(seed).await? {
        log::warn!("Seed file {:?} not found; starting with an empty catalog", seed);
        return Ok(0);
    }
    let seed_records = load_seed_file(seed)
        .await
        .map_err(|source| CatalogError::Seed {
            path: seed.to_path_buf(),
            source,
        })?;
    let count = records
        .insert_many(seed_records)
        .await
        .map_err(|source| CatalogError::Seed {
            path: seed.to_path_buf(),
            source,
        })?;
    log::info!("Seeded {count} meetings from {:?}", seed);
    Ok(count)
}

async fn build_index(
    dir: &Path,
    embedder: Arc<dyn Embedder>,
    records: &RecordStore,
    embed_timeout: Duration,
) -> Result<VectorStore> {
    let mut index = VectorStore::new(dir, embedder).with_embed_timeout(embed_timeout);
    let docs: Vec<_> = records.list().map(project).collect();
    let count = docs.len();
    index.insert_batch(docs).await?;
    index.save().await?;
    log::info!("Built index with {count} documents");
    Ok(index)
}
