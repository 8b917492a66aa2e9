use crate::embeddings::cosine_similarity;
use crate::error::{Result, VectorStoreError};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Exact nearest-neighbor index (brute-force cosine similarity).
///
/// Meeting catalogs are small; a linear scan is exact and fast enough.
pub struct FlatIndex {
    dimension: usize,
    vectors: HashMap<u64, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add vector to index
    pub fn add(&mut self, id: u64, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        self.vectors.insert(id, vector.to_vec());
        Ok(())
    }

    pub fn remove(&mut self, id: u64) -> bool {
        self.vectors.remove(&id).is_some()
    }

    /// Search for k nearest neighbors using cosine similarity.
    /// Returns (id, score) sorted by score descending; equal scores favor the newer id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scores: Vec<(u64, f32)> = self
            .vectors
            .iter()
            .map(|(id, vector)| (*id, cosine_similarity(query, vector)))
            .collect();

        scores.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });
        scores.truncate(k);

        Ok(scores)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_search() {
        let mut index = FlatIndex::new(3);

        index.add(0, &[1.0, 0.0, 0.0]).unwrap();
        index.add(1, &[0.9, 0.1, 0.0]).unwrap();
        index.add(2, &[0.0, 1.0, 0.0]).unwrap();

        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 1e-6);

        assert_eq!(results[1].0, 1);
        assert!(results[1].1 > 0.9);
    }

    #[test]
    fn test_ties_prefer_newer_ids() {
        let mut index = FlatIndex::new(2);
        index.add(3, &[1.0, 0.0]).unwrap();
        index.add(8, &[1.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![8, 3]);
    }

    #[test]
    fn test_remove() {
        let mut index = FlatIndex::new(2);
        index.add(1, &[1.0, 0.0]).unwrap();
        assert!(index.remove(1));
        assert!(!index.remove(1));
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        let result = index.add(0, &[1.0, 0.0]);
        assert!(result.is_err());

        index.add(0, &[1.0, 0.0, 0.0]).unwrap();
        let result = index.search(&[1.0, 0.0], 1);
        assert!(result.is_err());
    }
}
