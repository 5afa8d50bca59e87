// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by several layers:
//
//   checkpoint.rs   — Saving and loading model weights
//                     Uses Burn's CompactRecorder for the
//                     parameters, plus JSON files for the
//                     iteration counter and the RunConfig
//                     so inference can rebuild the model.
//
//   vocab_store.rs  — Vocabulary files
//                     Builds frequency-ordered vocabularies
//                     from the training corpus and maps
//                     tokens to IDs and back.
//
//   metrics.rs      — Training and evaluation metrics
//                     Appends windowed losses to a CSV file
//                     and computes sentence-level BLEU.
//
// Reference: Burn Book §5 (Checkpointing)
//            Papineni et al. (2002) BLEU

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Training metrics CSV logger and BLEU
pub mod metrics;
