// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Turns one source sentence into a translation:
//
//   text → tokens → IDs → smallest bucket with room for the
//   source → singleton batch → infer_step → greedy argmax per
//   step → cut at the first EOS → target tokens
//
// Only the source length decides the bucket here; the target
// side is a START placeholder.
use crate::data::batcher::BatchBuilder;
use crate::data::preprocessor::Preprocessor;
use crate::domain::bucket::BucketCatalog;
use crate::domain::error::{PipelineError, Result};
use crate::domain::example::{EOS_ID, RESERVED_TOKENS, UNK_ID};
use crate::domain::traits::SequenceLearner;
use crate::infra::vocab_store::Vocabulary;

/// Argmax of row 0 at every timestep, truncated before the first EOS.
pub fn greedy_decode(distributions: &[Vec<Vec<f32>>]) -> Vec<u32> {
    distributions
        .iter()
        .map(|step| step.first().map(|row| argmax(row)).unwrap_or(EOS_ID))
        .take_while(|&id| id != EOS_ID)
        .collect()
}

/// First index of the largest value. Empty rows give EOS.
fn argmax(row: &[f32]) -> u32 {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in row.iter().enumerate() {
        if best.map_or(true, |(_, b)| p > b) {
            best = Some((i, p));
        }
    }
    best.map(|(i, _)| i as u32).unwrap_or(EOS_ID)
}

pub struct Translator<L> {
    learner:      L,
    catalog:      BucketCatalog,
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
    preprocessor: Preprocessor,
}

impl<L: SequenceLearner> Translator<L> {
    pub fn new(
        learner:      L,
        catalog:      BucketCatalog,
        source_vocab: Vocabulary,
        target_vocab: Vocabulary,
    ) -> Self {
        Self {
            learner,
            catalog,
            source_vocab,
            target_vocab,
            preprocessor: Preprocessor::new(),
        }
    }

    /// Longest source, in tokens, that any bucket accepts.
    pub fn max_source_len(&self) -> usize {
        self.catalog.max_source_len()
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Decoded target IDs for already-encoded source IDs.
    /// An oversized source is `NoBucketFits`.
    pub fn translate_ids(&self, source_ids: &[u32]) -> Result<Vec<u32>> {
        let bucket_id = self.catalog.classify_source(source_ids.len())?;
        let bucket = self.catalog.get(bucket_id).ok_or(PipelineError::NoBucketFits {
            length: source_ids.len(),
            max:    self.catalog.max_source_len(),
        })?;
        let batch = BatchBuilder::single(source_ids, bucket)?;
        let distributions = self.learner.infer_step(bucket_id, &batch)?;
        Ok(greedy_decode(&distributions))
    }

    /// Target tokens for a raw source line.
    pub fn translate_tokens(&self, text: &str) -> Result<Vec<String>> {
        let ids = self.source_vocab.encode(text, &self.preprocessor);
        tracing::debug!("Encoded {} source tokens", ids.len());
        let unk = RESERVED_TOKENS[UNK_ID as usize];
        Ok(self
            .translate_ids(&ids)?
            .into_iter()
            .map(|id| self.target_vocab.token(id).unwrap_or(unk).to_string())
            .collect())
    }

    /// Space-joined translation of a raw source line.
    pub fn translate(&self, text: &str) -> Result<String> {
        Ok(self.translate_tokens(text)?.join(" "))
    }
}
