// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// The typed failures raised by the bucketing, batching,
// training and decoding code. The application layer wraps
// these in anyhow with extra context.
//
// Recoverable:
//   NoBucketFits        — evaluation / translation skip the input
//
// Fatal:
//   EmptyDataset        — nothing left to train on after partitioning
//   LengthInvariant     — an example escaped its bucket (partitioning bug)
//   CheckpointMissing   — inference run without a trained model
//   CheckpointCorrupt   — checkpoint exists but cannot be restored
//   NoEvaluableExamples — `test` filtered out every example

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the core pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no bucket fits an input of length {length} (largest source capacity is {max})")]
    NoBucketFits { length: usize, max: usize },

    #[error("dataset is empty: no example fits any bucket")]
    EmptyDataset,

    #[error(
        "example of lengths ({source_len}, {target_len}) exceeds bucket capacity \
         ({max_source_len}, {max_target_len})"
    )]
    LengthInvariant {
        source_len: usize,
        target_len: usize,
        max_source_len: usize,
        max_target_len: usize,
    },

    #[error("checkpoint not found at '{}'. Have you run 'train' first?", .0.display())]
    CheckpointMissing(PathBuf),

    #[error("checkpoint at '{}' is corrupt: {reason}", .path.display())]
    CheckpointCorrupt { path: PathBuf, reason: String },

    #[error("no evaluable examples: every source exceeded the largest bucket")]
    NoEvaluableExamples,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed corpus '{}' at line {line}: {reason}", .path.display())]
    MalformedCorpus {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid vocabulary '{}': {reason}", .path.display())]
    InvalidVocabulary { path: PathBuf, reason: String },

    #[error("sequence learner failed: {0}")]
    Learner(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors a per-example loop may skip over.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::NoBucketFits { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
