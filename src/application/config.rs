// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Every knob of a run in one serialisable struct.
// `train` saves it as train_config.json next to the checkpoint;
// `test` and `translate` read it back to rebuild the same
// network and bucket layout.
//
// Unknown fields are rejected; missing fields take the
// defaults below, so a config file only needs the overrides:
//
//   { "max_iterations": 5000, "batch_size": 64 }

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::bucket::BucketCatalog;
use crate::domain::error::PipelineError;
use crate::domain::example::RESERVED_TOKENS;
use crate::ml::learner::LearnerOptions;
use crate::ml::model::Seq2SeqConfig;
use crate::ml::trainer::TrainerSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    // model
    pub enc_vocab_size:       usize,
    pub dec_vocab_size:       usize,
    pub num_sampled_classes:  usize,
    pub hidden_size:          usize,
    pub num_layers:           usize,

    // optimisation
    pub batch_size:           usize,
    pub learning_rate:        f64,
    pub max_grad_norm:        f32,
    pub max_iterations:       usize,

    /// (max_source_len, max_target_len), ordered small → large
    pub buckets:              Vec<(usize, usize)>,

    // schedule
    pub steps_per_log:        usize,
    pub steps_per_checkpoint: usize,

    // paths and corpus names
    pub data_dir:             String,
    pub checkpoint_dir:       String,
    pub source_lang:          String,
    pub target_lang:          String,
    pub train_prefix:         String,
    pub test_prefix:          String,

    pub vocab_threshold:      usize,
    /// Fixed RNG seed for bucket and batch sampling; None = from entropy
    pub seed:                 Option<u64>,
    pub resume:               bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enc_vocab_size:       41303,
            dec_vocab_size:       18778,
            num_sampled_classes:  18777,
            hidden_size:          256,
            num_layers:           3,
            batch_size:           256,
            learning_rate:        0.5,
            max_grad_norm:        5.0,
            max_iterations:       30000,
            buckets:              vec![(19, 19), (28, 28), (33, 33), (40, 43), (50, 53), (60, 63)],
            steps_per_log:        2000,
            steps_per_checkpoint: 0,
            data_dir:             "evdata".to_string(),
            checkpoint_dir:       "model".to_string(),
            source_lang:          "en".to_string(),
            target_lang:          "vi".to_string(),
            train_prefix:         "train".to_string(),
            test_prefix:          "tst2012".to_string(),
            vocab_threshold:      1,
            seed:                 None,
            resume:               false,
        }
    }
}

impl RunConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("Cannot parse config file '{}'", path.display()))?;
        Ok(cfg)
    }

    pub fn catalog(&self) -> std::result::Result<BucketCatalog, PipelineError> {
        BucketCatalog::from_pairs(&self.buckets)
    }

    /// Check everything that would otherwise fail deep inside a run.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        self.catalog()?;
        let reserved = RESERVED_TOKENS.len();
        if self.enc_vocab_size <= reserved || self.dec_vocab_size <= reserved {
            return invalid(format!("vocabulary sizes must exceed the {reserved} reserved tokens"));
        }
        if self.num_sampled_classes >= self.dec_vocab_size {
            return invalid(format!(
                "num_sampled_classes ({}) must be smaller than dec_vocab_size ({})",
                self.num_sampled_classes, self.dec_vocab_size
            ));
        }
        if self.hidden_size == 0 || self.num_layers == 0 {
            return invalid("hidden_size and num_layers must be at least 1".to_string());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.max_grad_norm.is_finite() && self.max_grad_norm > 0.0) {
            return invalid(format!("max_grad_norm must be positive, got {}", self.max_grad_norm));
        }
        if self.steps_per_log == 0 {
            return invalid("steps_per_log must be at least 1".to_string());
        }
        Ok(())
    }

    /// Adopt the sizes of the vocabularies actually on disk.
    pub fn sync_vocab_sizes(&mut self, enc: usize, dec: usize) {
        if enc != self.enc_vocab_size || dec != self.dec_vocab_size {
            tracing::info!(
                "Vocabulary sizes from files: {} → {} (configured {} → {})",
                enc, dec, self.enc_vocab_size, self.dec_vocab_size,
            );
        }
        self.enc_vocab_size = enc;
        self.dec_vocab_size = dec;
        if self.num_sampled_classes >= dec {
            let clamped = dec.saturating_sub(1);
            tracing::warn!("num_sampled_classes {} clamped to {}", self.num_sampled_classes, clamped);
            self.num_sampled_classes = clamped;
        }
    }

    // ─── Derived Settings ─────────────────────────────────────────────────────
    pub fn model_config(&self) -> Seq2SeqConfig {
        Seq2SeqConfig::new(self.enc_vocab_size, self.dec_vocab_size, self.hidden_size, self.num_layers)
    }

    pub fn learner_options(&self) -> LearnerOptions {
        LearnerOptions {
            learning_rate: self.learning_rate,
            max_grad_norm: self.max_grad_norm,
        }
    }

    pub fn trainer_settings(&self) -> TrainerSettings {
        TrainerSettings {
            batch_size:           self.batch_size,
            max_iterations:       self.max_iterations,
            steps_per_log:        self.steps_per_log,
            steps_per_checkpoint: self.steps_per_checkpoint,
            checkpoint_dir:       PathBuf::from(&self.checkpoint_dir),
        }
    }

    // ─── Paths ────────────────────────────────────────────────────────────────
    /// Raw text corpus, e.g. evdata/train.en
    pub fn raw_path(&self, prefix: &str, lang: &str) -> PathBuf {
        Path::new(&self.data_dir).join(format!("{prefix}.{lang}"))
    }

    /// Token-ID corpus, e.g. evdata/train_ids.en
    pub fn ids_path(&self, prefix: &str, lang: &str) -> PathBuf {
        Path::new(&self.data_dir).join(format!("{prefix}_ids.{lang}"))
    }

    /// Vocabulary file, e.g. evdata/vocab.en
    pub fn vocab_path(&self, lang: &str) -> PathBuf {
        Path::new(&self.data_dir).join(format!("vocab.{lang}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = RunConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.catalog().unwrap().len(), 6);
        assert_eq!(cfg.catalog().unwrap().max_source_len(), 60);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "max_iterations": 10, "seed": 3 }"#).unwrap();
        assert_eq!(cfg.max_iterations, 10);
        assert_eq!(cfg.seed, Some(3));
        assert_eq!(cfg.batch_size, 256);
        assert!(serde_json::from_str::<RunConfig>(r#"{ "max_iter": 10 }"#).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = RunConfig::default();
        cfg.num_sampled_classes = cfg.dec_vocab_size;
        assert!(matches!(cfg.validate(), Err(PipelineError::InvalidConfig(_))));

        let mut cfg = RunConfig::default();
        cfg.buckets = vec![(20, 20), (10, 10)];
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.learning_rate = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_sync_vocab_sizes_clamps_sampled_classes() {
        let mut cfg = RunConfig::default();
        cfg.sync_vocab_sizes(120, 80);
        assert_eq!((cfg.enc_vocab_size, cfg.dec_vocab_size), (120, 80));
        assert_eq!(cfg.num_sampled_classes, 79);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_paths() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.ids_path("train", "vi"), Path::new("evdata").join("train_ids.vi"));
        assert_eq!(cfg.vocab_path("en"), Path::new("evdata").join("vocab.en"));
        assert_eq!(cfg.raw_path("tst2012", "en"), Path::new("evdata").join("tst2012.en"));
    }
}
