// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer holds all of the Burn-specific code except the
// checkpoint files (infra) and the Dataset impl on bucket pools
// (data). Everything above it talks to the network through the
// SequenceLearner and Persistable traits from the domain layer.
//
//   model.rs      — GRU encoder/decoder with attention
//                   • source and target embeddings
//                   • stacked GRU encoder
//                   • stacked GRU decoder seeded with the
//                     encoder's final states
//                   • dot-product attention + tanh combine
//                   • projection onto the target vocabulary
//
//   learner.rs    — BurnLearner: batches → tensors, masked
//                   cross-entropy, SGD with norm clipping,
//                   greedy feed-previous inference
//
//   trainer.rs    — iteration loop: bucket sampling, windowed
//                   loss logging, checkpointing
//
//   inferencer.rs — greedy decoding and the Translator
//
//   evaluator.rs  — mean sentence BLEU over a test corpus
//
// Reference: Sutskever et al. (2014) Sequence to Sequence Learning
//            Luong et al. (2015) Effective Approaches to Attention

/// Seq2seq network architecture
pub mod model;

/// Burn-backed SequenceLearner
pub mod learner;

/// Training orchestrator
pub mod trainer;

/// Greedy decoding and translation
pub mod inferencer;

/// BLEU evaluation over held-out pairs
pub mod evaluator;
