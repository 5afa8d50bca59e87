// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the run configuration
//   Step 2: Prepare ID files if missing       (Layer 2 - prepare)
//   Step 3: Load vocabularies, sync sizes     (Layer 6 - infra)
//   Step 4: Partition the corpus into buckets (Layer 4 - data)
//   Step 5: Save config for inference         (Layer 6 - infra)
//   Step 6: Build the learner, maybe resume   (Layer 5 - ml)
//   Step 7: Run the training loop             (Layer 5 - ml)

use std::path::Path;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::config::RunConfig;
use crate::application::prepare_use_case::PrepareUseCase;
use crate::data::loader::CorpusPartitioner;
use crate::domain::traits::Persistable;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    vocab_store::Vocabulary,
};
use crate::ml::learner::default_learner;
use crate::ml::trainer::{Trainer, TrainingSummary};

pub struct TrainUseCase {
    config: RunConfig,
}

impl TrainUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let mut cfg = self.config.clone();

        // ── Step 1: Fail fast on bad settings ─────────────────────────────────
        cfg.validate().context("Invalid run configuration")?;

        // ── Step 2: Vocabularies and ID files ─────────────────────────────────
        if !PrepareUseCase::ids_ready(&cfg) {
            tracing::info!("ID files missing in '{}', preparing data first", cfg.data_dir);
            PrepareUseCase::new(cfg.clone()).execute()?;
        }

        // ── Step 3: Model sizes follow the vocabulary files ──────────────────
        let src_vocab = load_vocab(&cfg.vocab_path(&cfg.source_lang))?;
        let tgt_vocab = load_vocab(&cfg.vocab_path(&cfg.target_lang))?;
        cfg.sync_vocab_sizes(src_vocab.len(), tgt_vocab.len());
        if cfg.num_sampled_classes > 0 {
            tracing::debug!(
                "num_sampled_classes={} recorded; training uses the full softmax",
                cfg.num_sampled_classes
            );
        }

        // ── Step 4: Bucketed training data ────────────────────────────────────
        let catalog = cfg.catalog()?;
        let src_ids = cfg.ids_path(&cfg.train_prefix, &cfg.source_lang);
        let tgt_ids = cfg.ids_path(&cfg.train_prefix, &cfg.target_lang);
        let dataset = CorpusPartitioner::new(catalog.clone())
            .with_vocab_sizes(cfg.enc_vocab_size, cfg.dec_vocab_size)
            .load(&src_ids, &tgt_ids)
            .with_context(|| format!("Cannot load training data from '{}'", src_ids.display()))?;
        for (id, (bucket, size)) in catalog.iter().zip(dataset.pool_sizes()).enumerate() {
            tracing::info!(
                "Bucket {} ({}, {}): {} examples",
                id, bucket.max_source_len, bucket.max_target_len, size,
            );
        }

        // ── Step 5: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(&cfg)?;

        // ── Step 6: Learner (fresh or restored) ──────────────────────────────
        let mut learner = default_learner(&cfg.model_config(), catalog, cfg.learner_options());
        let start = if cfg.resume && ckpt_manager.exists() {
            Some(learner.restore(ckpt_manager.dir()).context("Cannot resume from checkpoint")?)
        } else {
            None
        };

        // ── Step 7: Training loop (Layer 5) ──────────────────────────────────
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let metrics = MetricsLogger::new(ckpt_manager.dir())?;
        let mut trainer = Trainer::new(learner, &dataset, cfg.trainer_settings(), rng)?
            .with_metrics(metrics);
        if let Some(iteration) = start {
            trainer = trainer.resume_from(iteration);
        }

        let summary = trainer.run(|_| false)?;
        tracing::info!("Training complete after {} steps", summary.steps_taken);
        Ok(summary)
    }
}

fn load_vocab(path: &Path) -> Result<Vocabulary> {
    Vocabulary::load(path).with_context(|| format!("Cannot load vocabulary '{}'", path.display()))
}
