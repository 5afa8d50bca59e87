// ============================================================
// Layer 4 — Batch Builder
// ============================================================
// Samples examples from one bucket pool and lays them out as a
// fixed-shape, time-major batch for the sequence learner.
//
// For each of `batch_size` draws (uniform, with replacement):
//   source → right-pad with PAD to max_source_len, then REVERSE
//            so the end of the sentence sits on the encoder's
//            first step
//   target → right-pad with PAD to max_target_len
//
// Then transpose example-major → time-major:
//   [[a1 a2 a3], [b1 b2 b3]]  →  [[a1 b1], [a2 b2], [a3 b3]]
//
// Decoder masks weight the loss at each decoder position t.
// Position t is trained to predict target[t+1], so:
//   mask[t] = 0  if t is the last position (no t+1 exists)
//   mask[t] = 0  if target[t+1] is PAD
//   mask[t] = 1  otherwise
//
// Example, bucket (4,4), source [5,5], target [7,7,7]:
//   encoder inputs  reverse([5,5,0,0]) = [0,0,5,5]
//   decoder inputs  [7,7,7,0]
//   decoder masks   [1,1,0,0]
//
// The learner sees one more decoder slot than the bucket's
// target capacity: `shifted_targets()` supplies the targets
// decoder_inputs[1..] followed by an all-PAD final row.

use burn::data::dataset::Dataset;
use rand::Rng;

use crate::domain::bucket::Bucket;
use crate::domain::error::{PipelineError, Result};
use crate::domain::example::{Example, PAD_ID, START_ID};

// ─── Batch ────────────────────────────────────────────────────────────────────
/// A time-major batch. The outer index is the sequence position,
/// the inner index is the example within the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Reversed, padded sources: `max_source_len` rows of `batch_size` IDs
    pub encoder_inputs: Vec<Vec<u32>>,

    /// Padded targets: `max_target_len` rows of `batch_size` IDs
    pub decoder_inputs: Vec<Vec<u32>>,

    /// Loss weights: `max_target_len` rows of `batch_size` 0.0/1.0 values
    pub decoder_masks: Vec<Vec<f32>>,
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.encoder_inputs.first().map(Vec::len).unwrap_or(0)
    }

    pub fn encoder_len(&self) -> usize { self.encoder_inputs.len() }

    pub fn decoder_len(&self) -> usize { self.decoder_inputs.len() }

    /// Supervision targets: decoder inputs shifted forward by one,
    /// padded with a final all-PAD row so there is one target per
    /// decoder position.
    pub fn shifted_targets(&self) -> Vec<Vec<u32>> {
        let width = self.batch_size();
        self.decoder_inputs
            .iter()
            .skip(1)
            .cloned()
            .chain(std::iter::once(vec![PAD_ID; width]))
            .collect()
    }

    /// Check every dimension against the bucket the batch claims to be for.
    pub fn check_shape(&self, bucket: Bucket) -> Result<()> {
        let width = self.batch_size();
        let rows_ok = self.encoder_inputs.iter().all(|r| r.len() == width)
            && self.decoder_inputs.iter().all(|r| r.len() == width)
            && self.decoder_masks.iter().all(|r| r.len() == width);

        if !rows_ok
            || self.encoder_len() != bucket.max_source_len
            || self.decoder_len() != bucket.max_target_len
            || self.decoder_masks.len() != bucket.max_target_len
        {
            return Err(PipelineError::LengthInvariant {
                source_len:     self.encoder_len(),
                target_len:     self.decoder_len().max(self.decoder_masks.len()),
                max_source_len: bucket.max_source_len,
                max_target_len: bucket.max_target_len,
            });
        }
        Ok(())
    }
}

// ─── BatchBuilder ─────────────────────────────────────────────────────────────
pub struct BatchBuilder;

impl BatchBuilder {
    /// Draw `batch_size` examples from `pool` with replacement and lay them out.
    pub fn build<D, R>(
        pool:       &D,
        bucket:     Bucket,
        batch_size: usize,
        rng:        &mut R,
    ) -> Result<Batch>
    where
        D: Dataset<Example> + ?Sized,
        R: Rng,
    {
        if batch_size == 0 {
            return Err(PipelineError::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        if pool.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }
        let mut drawn = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let index = rng.gen_range(0..pool.len());
            drawn.push(pool.get(index).ok_or(PipelineError::EmptyDataset)?);
        }
        let refs: Vec<&Example> = drawn.iter().collect();
        Self::from_examples(&refs, bucket)
    }

    /// Lay out the given examples, in order, as one batch.
    pub fn from_examples(examples: &[&Example], bucket: Bucket) -> Result<Batch> {
        let mut sources = Vec::with_capacity(examples.len());
        let mut targets = Vec::with_capacity(examples.len());

        for ex in examples {
            let (s, t) = ex.lengths();
            if !bucket.fits(s, t) {
                return Err(PipelineError::LengthInvariant {
                    source_len:     s,
                    target_len:     t,
                    max_source_len: bucket.max_source_len,
                    max_target_len: bucket.max_target_len,
                });
            }
            let mut source = pad(&ex.source_ids, bucket.max_source_len);
            source.reverse();
            sources.push(source);
            targets.push(pad(&ex.target_ids, bucket.max_target_len));
        }

        let decoder_masks = build_masks(&targets, bucket.max_target_len);
        Ok(Batch {
            encoder_inputs: to_time_major(&sources, bucket.max_source_len),
            decoder_inputs: to_time_major(&targets, bucket.max_target_len),
            decoder_masks,
        })
    }

    /// One-example batch for inference. The target is a placeholder
    /// holding only START, which seeds the decoder's first step.
    pub fn single(source_ids: &[u32], bucket: Bucket) -> Result<Batch> {
        let example = Example::new(source_ids.to_vec(), vec![START_ID]);
        Self::from_examples(&[&example], bucket)
    }
}

/// Right-pad `ids` with PAD up to `size`.
fn pad(ids: &[u32], size: usize) -> Vec<u32> {
    let mut out = ids.to_vec();
    out.resize(size, PAD_ID);
    out
}

/// Re-index example-major rows into time-major rows.
fn to_time_major(rows: &[Vec<u32>], len: usize) -> Vec<Vec<u32>> {
    (0..len)
        .map(|t| rows.iter().map(|row| row[t]).collect())
        .collect()
}

fn build_masks(targets: &[Vec<u32>], len: usize) -> Vec<Vec<f32>> {
    (0..len)
        .map(|t| {
            targets
                .iter()
                .map(|target| {
                    if t + 1 == len || target[t + 1] == PAD_ID { 0.0 } else { 1.0 }
                })
                .collect()
        })
        .collect()
}
