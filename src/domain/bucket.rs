// ============================================================
// Layer 3 — Buckets and the Bucket Catalog
// ============================================================
// A bucket is a capacity class (max source length, max target
// length). Every example is padded up to the capacities of the
// bucket it lands in, so shorter sentences share small buckets
// and only long sentences pay for long padding.
//
// Two classification policies exist and are kept apart:
//   classify         — training data: BOTH lengths must fit
//   classify_source  — inference: only the source is known yet
//
// Example with catalog [(4,4), (6,6)]:
//   classify(2, 3)        → bucket 0
//   classify(2, 5)        → bucket 1 (target too long for 0)
//   classify_source(5)    → bucket 1
//   classify_source(7)    → NoBucketFits

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// An immutable (source, target) capacity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub max_source_len: usize,
    pub max_target_len: usize,
}

impl Bucket {
    pub fn new(max_source_len: usize, max_target_len: usize) -> Self {
        Self { max_source_len, max_target_len }
    }

    /// True if an example of these lengths can be padded into this bucket.
    pub fn fits(&self, source_len: usize, target_len: usize) -> bool {
        source_len <= self.max_source_len && target_len <= self.max_target_len
    }
}

impl From<(usize, usize)> for Bucket {
    fn from((s, t): (usize, usize)) -> Self {
        Bucket::new(s, t)
    }
}

/// The ordered, fixed list of buckets used by both training and inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCatalog {
    buckets: Vec<Bucket>,
}

impl BucketCatalog {
    /// Build a catalog, rejecting empty lists, zero capacities and
    /// capacities that shrink from one bucket to the next.
    pub fn new(buckets: Vec<Bucket>) -> Result<Self> {
        if buckets.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "bucket list must not be empty".to_string(),
            ));
        }
        if let Some(b) = buckets.iter().find(|b| b.max_source_len == 0 || b.max_target_len == 0) {
            return Err(PipelineError::InvalidConfig(format!(
                "bucket ({}, {}) has a zero capacity",
                b.max_source_len, b.max_target_len
            )));
        }
        for pair in buckets.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.max_source_len < prev.max_source_len || next.max_target_len < prev.max_target_len {
                return Err(PipelineError::InvalidConfig(format!(
                    "bucket capacities must be non-decreasing: ({}, {}) follows ({}, {})",
                    next.max_source_len, next.max_target_len,
                    prev.max_source_len, prev.max_target_len,
                )));
            }
        }
        Ok(Self { buckets })
    }

    pub fn from_pairs(pairs: &[(usize, usize)]) -> Result<Self> {
        Self::new(pairs.iter().copied().map(Bucket::from).collect())
    }

    /// Smallest bucket where both the source and the target fit.
    pub fn classify(&self, source_len: usize, target_len: usize) -> Result<usize> {
        self.buckets
            .iter()
            .position(|b| b.fits(source_len, target_len))
            .ok_or(PipelineError::NoBucketFits {
                length: source_len.max(target_len),
                max: self.max_source_len(),
            })
    }

    /// Smallest bucket whose source capacity covers `source_len`.
    /// The target is ignored because inference has not produced one yet.
    pub fn classify_source(&self, source_len: usize) -> Result<usize> {
        self.buckets
            .iter()
            .position(|b| b.max_source_len >= source_len)
            .ok_or(PipelineError::NoBucketFits {
                length: source_len,
                max: self.max_source_len(),
            })
    }

    pub fn get(&self, bucket_id: usize) -> Option<Bucket> {
        self.buckets.get(bucket_id).copied()
    }

    /// The largest accepted input length (last bucket's source capacity).
    pub fn max_source_len(&self) -> usize {
        self.buckets.last().map(|b| b.max_source_len).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> BucketCatalog {
        BucketCatalog::from_pairs(&[(4, 4), (6, 6)]).unwrap()
    }

    #[test]
    fn test_classify_picks_smallest_fitting_bucket() {
        let c = catalog();
        assert_eq!(c.classify(2, 3).unwrap(), 0);
        assert_eq!(c.classify(4, 4).unwrap(), 0);
        assert_eq!(c.classify(2, 5).unwrap(), 1);
        assert_eq!(c.classify(5, 1).unwrap(), 1);
    }

    #[test]
    fn test_classify_rejects_oversized_pairs() {
        let c = catalog();
        assert!(matches!(c.classify(7, 1), Err(PipelineError::NoBucketFits { .. })));
        assert!(matches!(c.classify(1, 7), Err(PipelineError::NoBucketFits { .. })));
    }

    #[test]
    fn test_classified_examples_fit_their_bucket() {
        let c = BucketCatalog::from_pairs(&[(19, 19), (28, 28), (33, 33), (40, 43)]).unwrap();
        for s in 0..45 {
            for t in 0..45 {
                if let Ok(id) = c.classify(s, t) {
                    let b = c.get(id).unwrap();
                    assert!(s <= b.max_source_len && t <= b.max_target_len);
                }
            }
        }
    }

    #[test]
    fn test_classify_source_ignores_target() {
        let c = catalog();
        assert_eq!(c.classify_source(0).unwrap(), 0);
        assert_eq!(c.classify_source(4).unwrap(), 0);
        assert_eq!(c.classify_source(5).unwrap(), 1);
    }

    #[test]
    fn test_source_longer_than_largest_bucket() {
        let c = BucketCatalog::from_pairs(&[(19, 19), (40, 43)]).unwrap();
        match c.classify_source(50) {
            Err(PipelineError::NoBucketFits { length, max }) => {
                assert_eq!(length, 50);
                assert_eq!(max, 40);
            }
            other => panic!("expected NoBucketFits, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_decreasing_capacities() {
        assert!(BucketCatalog::from_pairs(&[(6, 6), (4, 8)]).is_err());
        assert!(BucketCatalog::from_pairs(&[(4, 8), (6, 6)]).is_err());
        assert!(BucketCatalog::from_pairs(&[]).is_err());
        assert!(BucketCatalog::from_pairs(&[(0, 3)]).is_err());
    }

    #[test]
    fn test_max_source_len_is_last_bucket() {
        assert_eq!(catalog().max_source_len(), 6);
    }
}
