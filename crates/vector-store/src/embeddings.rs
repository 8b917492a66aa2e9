use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_HASH_DIMENSION: usize = 256;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const TRIGRAM_WEIGHT: f32 = 0.5;

/// Text → fixed-size vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in the index manifest
    fn id(&self) -> String;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("empty embedding batch".to_string()))
    }
}

/// Offline lexical embedder: feature-hashed bag of words plus character trigrams.
///
/// Deterministic across runs and platforms, so persisted vectors stay valid.
#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            self.accumulate(&mut vec, token.as_bytes(), 1.0);
            let chars: Vec<char> = token.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let trigram: String = window.iter().collect();
                    self.accumulate(&mut vec, format!("#{trigram}").as_bytes(), TRIGRAM_WEIGHT);
                }
            }
        }
        normalize(&mut vec);
        vec
    }

    fn accumulate(&self, vec: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a_64(feature);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        vec[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn id(&self) -> String {
        format!("hash-bow-{}", self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Embeddings from an Ollama-compatible `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    /// Connects lazily; the dimension is probed with a single embedding call.
    pub async fn connect(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(to_embedding_error)?;
        let mut embedder = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension: 0,
        };
        let probe = embedder.request(&["dimension probe".to_string()]).await?;
        embedder.dimension = probe.first().map(Vec::len).unwrap_or(0);
        if embedder.dimension == 0 {
            return Err(VectorStoreError::EmbeddingError(format!(
                "model '{model}' returned an empty embedding"
            )));
        }
        log::info!(
            "Connected to embedding model '{}' at {} (dimension {})",
            embedder.model,
            embedder.base_url,
            embedder.dimension
        );
        Ok(embedder)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(to_embedding_error)?;
        let json: Value = res
            .error_for_status()
            .map_err(to_embedding_error)?
            .json()
            .await
            .map_err(to_embedding_error)?;
        let vectors = parse_embed_response(&json)?;
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

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn id(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

fn parse_embed_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            VectorStoreError::EmbeddingError("response is missing embeddings array".to_string())
        })?;

    data.iter()
        .map(|item| {
            let values = item.as_array().ok_or_else(|| {
                VectorStoreError::EmbeddingError("embedding must be an array".to_string())
            })?;
            values
                .iter()
                .map(|v| {
                    v.as_f64().map(|n| n as f32).ok_or_else(|| {
                        VectorStoreError::EmbeddingError(
                            "embedding value must be numeric".to_string(),
                        )
                    })
                })
                .collect()
        })
        .collect()
}

fn to_embedding_error(error: reqwest::Error) -> VectorStoreError {
    VectorStoreError::EmbeddingError(format!("{error}"))
}

/// Lower-cased alphanumeric runs
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Words that carry no topic: filler and the field labels of projected text
const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "at", "attendees", "date", "did", "do",
    "find", "for", "i", "in", "is", "list", "location", "me", "meeting", "meetings", "my", "of",
    "on", "or", "our", "show", "the", "to", "we", "what", "when", "which", "who", "with",
];

const PREFIX_MATCH_MIN_LEN: usize = 4;

/// True when `text` contains at least one content word of `query`.
///
/// Words of four or more characters also match by prefix in either
/// direction (`standups` ~ `standup`). A query made only of stop words
/// places no constraint and matches everything.
pub fn shares_term(query: &str, text: &str) -> bool {
    let terms: Vec<String> = tokenize(query)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect();
    if terms.is_empty() {
        return true;
    }
    let words: Vec<String> = tokenize(text).collect();
    terms.iter().any(|term| {
        words.iter().any(|word| {
            word == term
                || (term.len() >= PREFIX_MATCH_MIN_LEN
                    && word.len() >= PREFIX_MATCH_MIN_LEN
                    && (word.starts_with(term.as_str()) || term.starts_with(word.as_str())))
        })
    })
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
