// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-facing goal per use case.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination, with anyhow context on
//     every failure so the CLI can print a useful message
//
//   prepare   raw corpus → vocabularies + ID files
//   train     ID files → trained checkpoint
//   evaluate  checkpoint + raw test corpus → mean BLEU
//   translate checkpoint + stdin → translations on stdout

/// Run configuration shared by every use case
pub mod config;

/// Vocabulary building and corpus encoding
pub mod prepare_use_case;

/// The training workflow
pub mod train_use_case;

/// BLEU evaluation on the test split
pub mod evaluate_use_case;

/// The interactive translation workflow
pub mod translate_use_case;
