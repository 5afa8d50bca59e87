use burn::data::dataset::Dataset;

use crate::domain::bucket::{Bucket, BucketCatalog};
use crate::domain::error::{PipelineError, Result};
use crate::domain::example::Example;

/// Append-only collection of examples that all fit one bucket.
/// Filled once at load time, then only sampled from.
#[derive(Debug, Clone)]
pub struct BucketPool {
    bucket:   Bucket,
    examples: Vec<Example>,
}

impl BucketPool {
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket, examples: Vec::new() }
    }

    pub fn push(&mut self, example: Example) {
        self.examples.push(example);
    }

    pub fn bucket(&self) -> Bucket { self.bucket }

    pub fn size(&self) -> usize { self.examples.len() }
}

impl Dataset<Example> for BucketPool {
    fn get(&self, index: usize) -> Option<Example> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

/// Cumulative sampling fractions over bucket indices.
///
/// `scale[i]` is the share of all examples living in buckets `0..=i`,
/// so the last entry is 1.0 and the sequence never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingDistribution {
    scale: Vec<f64>,
}

impl SamplingDistribution {
    pub fn from_sizes(sizes: &[usize]) -> Result<Self> {
        let total: usize = sizes.iter().sum();
        if total == 0 {
            return Err(PipelineError::EmptyDataset);
        }
        let mut running = 0usize;
        let scale = sizes
            .iter()
            .map(|&n| {
                running += n;
                running as f64 / total as f64
            })
            .collect();
        Ok(Self { scale })
    }

    /// Inverse-CDF lookup: the first bucket whose cumulative fraction
    /// exceeds `u`. `u` is expected in `[0, 1)`; anything at or above
    /// 1.0 lands in the last non-empty bucket.
    pub fn sample(&self, u: f64) -> usize {
        self.scale
            .iter()
            .position(|&s| s > u)
            .unwrap_or_else(|| self.last_non_empty())
    }

    fn last_non_empty(&self) -> usize {
        let mut prev = 0.0;
        let mut last = 0;
        for (i, &s) in self.scale.iter().enumerate() {
            if s > prev {
                last = i;
            }
            prev = s;
        }
        last
    }

    pub fn scale(&self) -> &[f64] { &self.scale }
}

/// All training pools, one per catalog bucket, in catalog order.
#[derive(Debug, Clone)]
pub struct BucketedDataset {
    catalog: BucketCatalog,
    pools:   Vec<BucketPool>,
    dropped: usize,
}

impl BucketedDataset {
    pub fn new(catalog: BucketCatalog) -> Self {
        let pools = catalog.iter().copied().map(BucketPool::new).collect();
        Self { catalog, pools, dropped: 0 }
    }

    /// File an example into the first bucket where both sides fit.
    /// Returns the bucket id, or `None` if the example was dropped.
    pub fn insert(&mut self, example: Example) -> Option<usize> {
        let (s, t) = example.lengths();
        match self.catalog.classify(s, t) {
            Ok(id) => {
                self.pools[id].push(example);
                Some(id)
            }
            Err(_) => {
                self.dropped += 1;
                None
            }
        }
    }

    pub fn sampling_distribution(&self) -> Result<SamplingDistribution> {
        SamplingDistribution::from_sizes(&self.pool_sizes())
    }

    pub fn pool(&self, bucket_id: usize) -> Option<&BucketPool> {
        self.pools.get(bucket_id)
    }

    pub fn pool_sizes(&self) -> Vec<usize> {
        self.pools.iter().map(BucketPool::size).collect()
    }

    pub fn total(&self) -> usize {
        self.pools.iter().map(BucketPool::size).sum()
    }

    /// Examples that fit no bucket and were left out
    pub fn dropped(&self) -> usize { self.dropped }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> BucketedDataset {
        BucketedDataset::new(BucketCatalog::from_pairs(&[(4, 4), (6, 6), (8, 8)]).unwrap())
    }

    #[test]
    fn test_insert_files_into_first_fitting_bucket() {
        let mut ds = dataset();
        assert_eq!(ds.insert(Example::new(vec![5, 5], vec![7, 7, 7])), Some(0));
        assert_eq!(ds.insert(Example::new(vec![5; 5], vec![7])), Some(1));
        assert_eq!(ds.insert(Example::new(vec![5; 9], vec![7])), None);
        assert_eq!(ds.pool_sizes(), vec![1, 1, 0]);
        assert_eq!(ds.dropped(), 1);
        assert_eq!(ds.pool(0).unwrap().len(), 1);
    }

    #[test]
    fn test_scale_is_cumulative_and_ends_at_one() {
        let dist = SamplingDistribution::from_sizes(&[1, 0, 3]).unwrap();
        assert_eq!(dist.scale(), &[0.25, 0.25, 1.0]);
        for w in dist.scale().windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert!((dist.scale().last().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_skips_empty_buckets() {
        let dist = SamplingDistribution::from_sizes(&[1, 0, 3]).unwrap();
        assert_eq!(dist.sample(0.0), 0);
        assert_eq!(dist.sample(0.2499), 0);
        assert_eq!(dist.sample(0.25), 2);
        assert_eq!(dist.sample(0.9999), 2);
        assert_eq!(dist.sample(1.0), 2);

        let trailing_empty = SamplingDistribution::from_sizes(&[2, 2, 0]).unwrap();
        assert_eq!(trailing_empty.sample(1.0), 1);
    }

    #[test]
    fn test_empty_sizes_are_rejected() {
        assert!(matches!(
            SamplingDistribution::from_sizes(&[0, 0]),
            Err(PipelineError::EmptyDataset)
        ));
        assert!(matches!(
            dataset().sampling_distribution(),
            Err(PipelineError::EmptyDataset)
        ));
    }
}
