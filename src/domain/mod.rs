// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits shared by every other layer:
// buckets, examples, the reserved token IDs, the learner
// capability traits and the error taxonomy.
//
// No burn types and no file I/O live here.

/// Buckets and the classification policies
pub mod bucket;

/// Token ID sentence pairs and reserved IDs
pub mod example;

/// SequenceLearner and Persistable capabilities
pub mod traits;

/// Typed pipeline errors
pub mod error;
