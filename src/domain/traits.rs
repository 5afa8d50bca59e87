// ============================================================
// Layer 3 — Core Traits (Capabilities)
// ============================================================
// The neural network is a capability the pipeline calls into,
// not something it knows the insides of. Anything that can take
// one optimisation step on a bucketed batch, and produce output
// distributions for one, can drive training and decoding.
//
// Implementations:
//   - BurnLearner   → GRU encoder/decoder with attention (ml/learner.rs)
//   - test doubles  → scripted learners in the trainer/evaluator tests

use std::path::Path;

use crate::data::batcher::Batch;
use crate::domain::error::Result;

// ─── StepOutcome ──────────────────────────────────────────────────────────────
/// What one training step reports back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Global gradient norm before clipping, when the learner can report it
    pub grad_norm: Option<f32>,
    /// Mask-weighted loss of this batch
    pub loss: f32,
}

// ─── SequenceLearner ──────────────────────────────────────────────────────────
/// A trainable sequence-to-sequence model addressed by bucket.
pub trait SequenceLearner {
    /// Run one optimisation step on `batch`, which was built for `bucket_id`.
    fn train_step(&mut self, bucket_id: usize, batch: &Batch) -> Result<StepOutcome>;

    /// Produce output distributions for `batch` without updating parameters.
    ///
    /// Layout is `[timestep][batch row][target vocab id]`, one timestep per
    /// decoder position of the bucket.
    fn infer_step(&self, bucket_id: usize, batch: &Batch) -> Result<Vec<Vec<Vec<f32>>>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose parameters can be snapshotted to a checkpoint directory.
pub trait Persistable {
    /// Write a whole-state snapshot plus the iteration counter,
    /// replacing whatever was saved there before.
    fn save(&self, dir: &Path, iteration: usize) -> Result<()>;

    /// Restore the snapshot in `dir` and return its iteration counter.
    fn restore(&mut self, dir: &Path) -> Result<usize>;
}
