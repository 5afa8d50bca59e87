// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between corpus files on disk and the time-major
// batches the learner consumes.
//
//   raw text lines
//       │
//       ▼
//   Preprocessor       → lowercase word/punctuation tokens
//       │
//       ▼
//   Vocabulary (infra) → token IDs, written to *_ids.* files
//       │
//       ▼
//   CorpusPartitioner  → pairs filed into per-bucket pools
//       │
//       ▼
//   BucketedDataset    → pools + cumulative sampling distribution
//       │
//       ▼
//   BatchBuilder       → padded, reversed, masked, time-major Batch

/// Basic tokenizer for raw corpus lines
pub mod preprocessor;

/// Reads line-aligned ID corpora into bucket pools
pub mod loader;

/// Bucket pools and the bucket sampling distribution
pub mod dataset;

/// Builds padded time-major batches from a pool
pub mod batcher;
