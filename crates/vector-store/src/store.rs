use crate::embeddings::Embedder;
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::paths::{DOCUMENTS_FILE_NAME, MANIFEST_FILE_NAME};
use crate::types::{IndexManifest, SearchResult, StoredDocument};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const MANIFEST_VERSION: u32 = 1;
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(10);

pub struct VectorStore {
    documents: BTreeMap<u64, StoredDocument>,
    index: FlatIndex,
    embedder: Arc<dyn Embedder>,
    dir: PathBuf,
    next_id: u64,
    embed_timeout: Duration,
}

impl VectorStore {
    /// Empty store that will persist into `dir`
    pub fn new(dir: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Self {
        log::info!(
            "Initializing VectorStore at {:?} (embedder {})",
            dir.as_ref(),
            embedder.id()
        );
        let index = FlatIndex::new(embedder.dimension());
        Self {
            documents: BTreeMap::new(),
            index,
            embedder,
            dir: dir.as_ref().to_path_buf(),
            next_id: 0,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Whether a persisted index exists at `dir`
    pub fn exists(dir: impl AsRef<Path>) -> bool {
        dir.as_ref().is_dir()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn embedder_id(&self) -> String {
        self.embedder.id()
    }

    /// Embed `text` and store it with `metadata` under a new document id.
    pub async fn insert(&mut self, text: String, metadata: Value) -> Result<u64> {
        let mut ids = self.insert_batch(vec![(text, metadata)]).await?;
        ids.pop()
            .ok_or_else(|| VectorStoreError::IndexError("insert produced no document".to_string()))
    }

    /// Batch embed for efficiency (one embedder round-trip)
    pub async fn insert_batch(&mut self, docs: Vec<(String, Value)>) -> Result<Vec<u64>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = docs.iter().map(|(text, _)| text.clone()).collect();
        let vectors = self.embed_texts(&texts).await?;
        for vector in &vectors {
            if vector.len() != self.index.dimension() {
                return Err(VectorStoreError::InvalidDimension {
                    expected: self.index.dimension(),
                    actual: vector.len(),
                });
            }
        }

        let mut ids = Vec::with_capacity(docs.len());
        for ((text, metadata), vector) in docs.into_iter().zip(vectors) {
            let doc_id = self.next_id;
            self.next_id += 1;

            self.index.add(doc_id, &vector)?;
            self.documents.insert(
                doc_id,
                StoredDocument {
                    doc_id,
                    text,
                    metadata,
                    vector,
                },
            );
            ids.push(doc_id);
        }

        log::debug!("Added {} documents. Total: {}", ids.len(), self.documents.len());
        Ok(ids)
    }

    /// Replace every document keyed by `key` with a freshly embedded one.
    ///
    /// The new text is embedded before anything is removed, so a failed
    /// embedding leaves the previous documents in place.
    pub async fn upsert(&mut self, key: &str, text: String, metadata: Value) -> Result<u64> {
        let vector = self
            .embed_texts(std::slice::from_ref(&text))
            .await?
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("empty embedding batch".to_string()))?;
        if vector.len() != self.index.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.index.dimension(),
                actual: vector.len(),
            });
        }

        let removed = self.remove_key(key);
        let doc_id = self.next_id;
        self.next_id += 1;
        self.index.add(doc_id, &vector)?;
        self.documents.insert(
            doc_id,
            StoredDocument {
                doc_id,
                text,
                metadata,
                vector,
            },
        );
        log::debug!("Upserted document {doc_id} for {key} (replaced {removed})");
        Ok(doc_id)
    }

    /// Drop every document keyed by `key`; returns how many were removed.
    pub fn remove_key(&mut self, key: &str) -> usize {
        let stale: Vec<u64> = self
            .documents
            .values()
            .filter(|doc| doc.key() == Some(key))
            .map(|doc| doc.doc_id)
            .collect();
        for doc_id in &stale {
            self.documents.remove(doc_id);
            self.index.remove(*doc_id);
        }
        stale.len()
    }

    /// Search for similar documents using cosine similarity
    pub async fn query(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        log::debug!("Searching for: '{}' (limit: {})", query, limit);
        if limit == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed_texts(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("empty embedding batch".to_string()))?;
        let neighbors = self.index.search(&query_vector, limit)?;

        let results: Vec<SearchResult> = neighbors
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.documents.get(&doc_id).map(|doc| SearchResult {
                    doc_id,
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    score,
                })
            })
            .collect();

        log::debug!("Found {} results", results.len());
        Ok(results)
    }

    pub fn get(&self, doc_id: u64) -> Option<&StoredDocument> {
        self.documents.get(&doc_id)
    }

    /// All documents in doc id order
    pub fn documents(&self) -> impl Iterator<Item = &StoredDocument> {
        self.documents.values()
    }

    /// Documents keyed by `key`, oldest first
    pub fn documents_for_key(&self, key: &str) -> Vec<&StoredDocument> {
        self.documents
            .values()
            .filter(|doc| doc.key() == Some(key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Save store to disk (documents first, manifest last)
    pub async fn save(&self) -> Result<()> {
        log::info!("Saving VectorStore to {:?}", self.dir);
        tokio::fs::create_dir_all(&self.dir).await?;

        let documents: Vec<&StoredDocument> = self.documents.values().collect();
        write_json_atomic(&self.dir.join(DOCUMENTS_FILE_NAME), &documents).await?;

        let manifest = IndexManifest {
            version: MANIFEST_VERSION,
            embedder_id: self.embedder.id(),
            dimension: self.index.dimension(),
            next_doc_id: self.next_id,
            documents: self.documents.len(),
        };
        write_json_atomic(&self.dir.join(MANIFEST_FILE_NAME), &manifest).await?;
        log::info!("VectorStore saved successfully");
        Ok(())
    }

    /// Load store from disk, rebuilding the in-memory index from stored vectors.
    pub async fn load(dir: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dir = dir.as_ref();
        log::info!("Loading VectorStore from {:?}", dir);

        let bytes = tokio::fs::read(dir.join(MANIFEST_FILE_NAME)).await?;
        let manifest: IndexManifest = serde_json::from_slice(&bytes)?;
        if manifest.embedder_id != embedder.id() {
            return Err(VectorStoreError::ManifestMismatch {
                stored: manifest.embedder_id,
                current: embedder.id(),
            });
        }
        if manifest.dimension != embedder.dimension() {
            return Err(VectorStoreError::InvalidDimension {
                expected: embedder.dimension(),
                actual: manifest.dimension,
            });
        }

        let bytes = tokio::fs::read(dir.join(DOCUMENTS_FILE_NAME)).await?;
        let stored: Vec<StoredDocument> = serde_json::from_slice(&bytes)?;
        if stored.len() != manifest.documents {
            return Err(VectorStoreError::IndexError(format!(
                "manifest lists {} documents, found {}",
                manifest.documents,
                stored.len()
            )));
        }

        let mut index = FlatIndex::new(manifest.dimension);
        let mut documents = BTreeMap::new();
        let mut next_id = manifest.next_doc_id;
        for doc in stored {
            index.add(doc.doc_id, &doc.vector)?;
            next_id = next_id.max(doc.doc_id + 1);
            documents.insert(doc.doc_id, doc);
        }

        log::info!("Loaded {} documents", documents.len());

        Ok(Self {
            documents,
            index,
            embedder,
            dir: dir.to_path_buf(),
            next_id,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        })
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = tokio::time::timeout(self.embed_timeout, self.embedder.embed_batch(texts))
            .await
            .map_err(|_| VectorStoreError::EmbeddingTimeout(self.embed_timeout.as_millis() as u64))??;
        if vectors.len() != texts.len() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
