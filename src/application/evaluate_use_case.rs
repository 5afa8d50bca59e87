// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a checkpoint on the raw test corpus:
//
//   <test_prefix>.<src>  ─┐
//                         ├─ zip line by line → Evaluator → mean BLEU
//   <test_prefix>.<tgt>  ─┘
//
// The learner is rebuilt the same way as for `translate`.

use anyhow::{Context, Result};

use crate::application::config::RunConfig;
use crate::data::loader::read_lines;
use crate::domain::traits::SequenceLearner;
use crate::ml::evaluator::{EvaluationReport, Evaluator};
use crate::ml::inferencer::Translator;

pub struct EvaluateUseCase<L> {
    config:     RunConfig,
    translator: Translator<L>,
}

impl<L: SequenceLearner> EvaluateUseCase<L> {
    pub fn new(config: RunConfig, translator: Translator<L>) -> Self {
        Self { config, translator }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let cfg = &self.config;
        let src_path = cfg.raw_path(&cfg.test_prefix, &cfg.source_lang);
        let ref_path = cfg.raw_path(&cfg.test_prefix, &cfg.target_lang);

        let sources = read_lines(&src_path)
            .with_context(|| format!("Cannot read test sources '{}'", src_path.display()))?;
        let references = read_lines(&ref_path)
            .with_context(|| format!("Cannot read test references '{}'", ref_path.display()))?;
        if sources.len() != references.len() {
            tracing::warn!(
                "Test files differ in length ({} vs {}), using the first {}",
                sources.len(), references.len(), sources.len().min(references.len()),
            );
        }

        let pairs: Vec<(String, String)> = sources.into_iter().zip(references).collect();
        tracing::info!("Evaluating {} test pairs", pairs.len());

        let report = Evaluator::new(&self.translator)
            .evaluate(&pairs)
            .context("Evaluation failed")?;
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::data::batcher::Batch;
    use crate::domain::bucket::BucketCatalog;
    use crate::domain::error::{PipelineError, Result as PipelineResult};
    use crate::domain::example::{EOS_ID, RESERVED_TOKENS};
    use crate::domain::traits::StepOutcome;
    use crate::infra::vocab_store::Vocabulary;

    /// Always answers "a b c d" (target IDs 4..=7).
    struct CountingLearner;

    impl SequenceLearner for CountingLearner {
        fn train_step(&mut self, _: usize, _: &Batch) -> PipelineResult<StepOutcome> {
            Ok(StepOutcome { grad_norm: None, loss: 0.0 })
        }

        fn infer_step(&self, _: usize, batch: &Batch) -> PipelineResult<Vec<Vec<Vec<f32>>>> {
            Ok((0..batch.decoder_len())
                .map(|t| {
                    let mut row = vec![0.0; 8];
                    row[if t < 4 { 4 + t } else { EOS_ID as usize }] = 1.0;
                    vec![row]
                })
                .collect())
        }
    }

    fn use_case(data_dir: &std::path::Path) -> EvaluateUseCase<CountingLearner> {
        let vocab = |words: &[&str]| {
            let mut tokens: Vec<String> = RESERVED_TOKENS.iter().map(|t| t.to_string()).collect();
            tokens.extend(words.iter().map(|w| w.to_string()));
            Vocabulary::from_tokens(tokens).unwrap()
        };
        let cfg = RunConfig {
            data_dir: data_dir.to_string_lossy().into_owned(),
            ..RunConfig::default()
        };
        let translator = Translator::new(
            CountingLearner,
            BucketCatalog::from_pairs(&[(2, 5)]).unwrap(),
            vocab(&["x", "y"]),
            vocab(&["a", "b", "c", "d"]),
        );
        EvaluateUseCase::new(cfg, translator)
    }

    #[test]
    fn test_reports_mean_bleu_and_filtered_count() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tst2012.en"), "x y\nx y x\nx\n").unwrap();
        fs::write(dir.path().join("tst2012.vi"), "A B C D\na b c d\nq\n").unwrap();

        let report = use_case(dir.path()).execute().unwrap();
        assert_eq!(report.retained, 2);
        assert_eq!(report.filtered, 1);
        assert!((report.mean_bleu - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_all_filtered_surfaces_no_evaluable_examples() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tst2012.en"), "x y x\n").unwrap();
        fs::write(dir.path().join("tst2012.vi"), "a\n").unwrap();

        let err = use_case(dir.path()).execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoEvaluableExamples)
        ));
    }
}
