// ============================================================
// Layer 2 — TranslateUseCase
// ============================================================
// Interactive translation from a trained checkpoint:
//
//   Step 1: Load train_config.json     (Layer 6 - infra)
//   Step 2: Load both vocabularies     (Layer 6 - infra)
//   Step 3: Rebuild + restore learner  (Layer 5 - ml)
//   Step 4: Read a line, translate it, print it, repeat
//
// An empty line or end of input ends the session; a line of
// only spaces is still translated. A line longer
// than the largest bucket prints a notice and the loop goes on.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::application::config::RunConfig;
use crate::domain::traits::{Persistable, SequenceLearner};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::Vocabulary};
use crate::ml::inferencer::Translator;
use crate::ml::learner::default_learner;

/// Rebuild the trained learner and its vocabularies from a checkpoint dir.
/// `data_dir` overrides the saved one when given.
pub fn load_translator(
    checkpoint_dir: &Path,
    data_dir:       Option<&str>,
) -> Result<(RunConfig, Translator<impl SequenceLearner>)> {
    // ── Step 1: Saved configuration ──────────────────────────────────────────
    let ckpt_manager = CheckpointManager::new(checkpoint_dir);
    let mut cfg: RunConfig = ckpt_manager
        .load_config()
        .context("Cannot load the training configuration")?;
    if let Some(dir) = data_dir {
        cfg.data_dir = dir.to_string();
    }

    // ── Step 2: Vocabularies ─────────────────────────────────────────────────
    let src_path = cfg.vocab_path(&cfg.source_lang);
    let tgt_path = cfg.vocab_path(&cfg.target_lang);
    let source_vocab = Vocabulary::load(&src_path)
        .with_context(|| format!("Cannot load vocabulary '{}'", src_path.display()))?;
    let target_vocab = Vocabulary::load(&tgt_path)
        .with_context(|| format!("Cannot load vocabulary '{}'", tgt_path.display()))?;

    // ── Step 3: Learner with restored weights ────────────────────────────────
    let catalog = cfg.catalog()?;
    let mut learner = default_learner(&cfg.model_config(), catalog.clone(), cfg.learner_options());
    let iteration = learner
        .restore(checkpoint_dir)
        .context("Cannot restore model weights")?;
    tracing::info!("Model restored from iteration {}", iteration);

    Ok((cfg, Translator::new(learner, catalog, source_vocab, target_vocab)))
}

pub struct TranslateUseCase<L> {
    translator: Translator<L>,
}

impl<L: SequenceLearner> TranslateUseCase<L> {
    pub fn new(translator: Translator<L>) -> Self {
        Self { translator }
    }

    /// Prompt loop over `input`, writing prompts and translations to `output`.
    /// Returns how many lines were translated.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<usize> {
        let max = self.translator.max_source_len();
        writeln!(output, "Type a sentence to translate. Empty line to exit. Max length is {max} tokens.")?;

        let mut translated = 0;
        loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }

            match self.translator.translate(line) {
                Ok(text) => {
                    writeln!(output, "{text}")?;
                    translated += 1;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::debug!("Skipping input: {}", e);
                    writeln!(output, "Input is too long: at most {max} tokens fit the model.")?;
                }
                Err(e) => return Err(e).context("Translation failed"),
            }
        }
        Ok(translated)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::Batch;
    use crate::domain::bucket::BucketCatalog;
    use crate::domain::error::Result as PipelineResult;
    use crate::domain::example::{EOS_ID, RESERVED_TOKENS};
    use crate::domain::traits::StepOutcome;

    /// Always answers with target ID 4 followed by EOS.
    struct OneWordLearner;

    impl SequenceLearner for OneWordLearner {
        fn train_step(&mut self, _: usize, _: &Batch) -> PipelineResult<StepOutcome> {
            Ok(StepOutcome { grad_norm: None, loss: 0.0 })
        }

        fn infer_step(&self, _: usize, batch: &Batch) -> PipelineResult<Vec<Vec<Vec<f32>>>> {
            Ok((0..batch.decoder_len())
                .map(|t| {
                    let mut row = vec![0.0; 5];
                    row[if t == 0 { 4 } else { EOS_ID as usize }] = 1.0;
                    vec![row]
                })
                .collect())
        }
    }

    fn use_case() -> TranslateUseCase<OneWordLearner> {
        let vocab = |w: &str| {
            let mut tokens: Vec<String> = RESERVED_TOKENS.iter().map(|t| t.to_string()).collect();
            tokens.push(w.to_string());
            Vocabulary::from_tokens(tokens).unwrap()
        };
        TranslateUseCase::new(Translator::new(
            OneWordLearner,
            BucketCatalog::from_pairs(&[(2, 3)]).unwrap(),
            vocab("hi"),
            vocab("chào"),
        ))
    }

    #[test]
    fn test_session_translates_until_blank_line() {
        let input = "hi\nhi hi hi\n\nhi\n".as_bytes();
        let mut out = Vec::new();
        let n = use_case().run(input, &mut out).unwrap();
        assert_eq!(n, 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("> chào\n"));
        assert!(text.contains("Input is too long: at most 2 tokens"));
        assert_eq!(text.matches("> ").count(), 3);
    }

    #[test]
    fn test_whitespace_line_does_not_end_session() {
        let input = "  \r\nhi\r\n\r\nhi\n".as_bytes();
        let mut out = Vec::new();
        assert_eq!(use_case().run(input, &mut out).unwrap(), 2);
        assert_eq!(String::from_utf8(out).unwrap().matches("> ").count(), 3);
    }

    #[test]
    fn test_eof_ends_session() {
        let mut out = Vec::new();
        assert_eq!(use_case().run("".as_bytes(), &mut out).unwrap(), 0);
    }

    #[test]
    fn test_missing_checkpoint_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_translator(dir.path(), None).err().unwrap();
        assert!(err.to_string().contains("training configuration"));
    }
}
