// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a trained learner on held-out (source, reference)
// pairs with smoothed sentence BLEU.
//
// Pairs whose source is longer than every bucket are skipped
// and counted as filtered. The reference goes through the same
// basic tokenizer as the training corpus before scoring.
use crate::domain::error::{PipelineError, Result};
use crate::domain::traits::SequenceLearner;
use crate::infra::metrics::sentence_bleu;
use crate::ml::inferencer::Translator;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Mean sentence BLEU over the retained pairs
    pub mean_bleu: f64,
    pub retained:     usize,
    pub filtered:     usize,
    /// Decoded hypothesis of every retained pair, in input order
    pub translations: Vec<String>,
}

pub struct Evaluator<'a, L> {
    translator: &'a Translator<L>,
}

impl<'a, L: SequenceLearner> Evaluator<'a, L> {
    pub fn new(translator: &'a Translator<L>) -> Self {
        Self { translator }
    }

    pub fn evaluate<S: AsRef<str>>(&self, pairs: &[(S, S)]) -> Result<EvaluationReport> {
        let mut total = 0.0f64;
        let mut retained = 0usize;
        let mut filtered = 0usize;
        let mut translations = Vec::new();

        for (i, (source, reference)) in pairs.iter().enumerate() {
            let candidate = match self.translator.translate_tokens(source.as_ref()) {
                Ok(tokens) => tokens,
                Err(e) if e.is_recoverable() => {
                    tracing::debug!("Skipping pair {}: {}", i, e);
                    filtered += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let reference = self.translator.preprocessor().tokenize(reference.as_ref());

            let score = sentence_bleu(&reference, &candidate);
            tracing::debug!("pair {} bleu={:.4}", i, score);
            total += score;
            retained += 1;
            translations.push(candidate.join(" "));
        }

        if retained == 0 {
            return Err(PipelineError::NoEvaluableExamples);
        }

        tracing::info!("Evaluated {} pairs, filtered {}", retained, filtered);
        Ok(EvaluationReport {
            mean_bleu: total / retained as f64,
            retained,
            filtered,
            translations,
        })
    }
}
