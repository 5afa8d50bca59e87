// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Turns the raw parallel corpus into the files training reads:
//
//   Step 1: Build vocab.<src> from train.<src>   (Layer 6 - infra)
//   Step 2: Build vocab.<tgt> from train.<tgt>   (Layer 6 - infra)
//   Step 3: Encode train.* and <test>.* into     (Layer 4 - data)
//           train_ids.* and <test>_ids.*
//
// Target-side ID lines are wrapped as  <s> ... <\s>  so the
// decoder learns where a sentence starts and stops.

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};

use crate::application::config::RunConfig;
use crate::data::{loader::read_lines, preprocessor::Preprocessor};
use crate::infra::vocab_store::Vocabulary;

/// What was written, per language.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareSummary {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    pub files_written:     usize,
}

pub struct PrepareUseCase {
    config: RunConfig,
}

impl PrepareUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// True when both training ID files already exist.
    pub fn ids_ready(cfg: &RunConfig) -> bool {
        cfg.ids_path(&cfg.train_prefix, &cfg.source_lang).exists()
            && cfg.ids_path(&cfg.train_prefix, &cfg.target_lang).exists()
    }

    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg = &self.config;
        let preprocessor = Preprocessor::new();

        // ── Steps 1-2: vocabularies from the training side ───────────────────
        let source_vocab = self.build_vocab(&cfg.source_lang, &preprocessor)?;
        let target_vocab = self.build_vocab(&cfg.target_lang, &preprocessor)?;

        // ── Step 3: ID files for every split that exists ─────────────────────
        let mut files_written = 0;
        for prefix in [&cfg.train_prefix, &cfg.test_prefix] {
            let src_raw = cfg.raw_path(prefix, &cfg.source_lang);
            if !src_raw.exists() && prefix != &cfg.train_prefix {
                tracing::warn!("No '{}' split found, skipping", prefix);
                continue;
            }
            write_ids(
                &src_raw,
                &cfg.ids_path(prefix, &cfg.source_lang),
                |line| source_vocab.encode(line, &preprocessor),
            )?;
            write_ids(
                &cfg.raw_path(prefix, &cfg.target_lang),
                &cfg.ids_path(prefix, &cfg.target_lang),
                |line| target_vocab.encode_target(line, &preprocessor),
            )?;
            files_written += 2;
        }

        tracing::info!("Data prepared in '{}'", cfg.data_dir);
        Ok(PrepareSummary {
            source_vocab_size: source_vocab.len(),
            target_vocab_size: target_vocab.len(),
            files_written,
        })
    }

    fn build_vocab(&self, lang: &str, preprocessor: &Preprocessor) -> Result<Vocabulary> {
        let cfg = &self.config;
        let raw = cfg.raw_path(&cfg.train_prefix, lang);
        let lines = read_lines(&raw)
            .with_context(|| format!("Cannot read training corpus '{}'", raw.display()))?;

        let vocab = Vocabulary::build(lines.iter().map(String::as_str), preprocessor, cfg.vocab_threshold)?;
        let path = cfg.vocab_path(lang);
        vocab
            .save(&path)
            .with_context(|| format!("Cannot write vocabulary '{}'", path.display()))?;
        tracing::info!("Vocabulary '{}': {} tokens", path.display(), vocab.len());
        Ok(vocab)
    }
}

/// Encode every line of `raw` and write the space-joined IDs to `out`.
fn write_ids<F>(raw: &Path, out: &Path, encode: F) -> Result<()>
where
    F: Fn(&str) -> Vec<u32>,
{
    let lines = read_lines(raw).with_context(|| format!("Cannot read corpus '{}'", raw.display()))?;
    let mut file = fs::File::create(out)
        .with_context(|| format!("Cannot create '{}'", out.display()))?;
    for line in &lines {
        let ids: Vec<String> = encode(line).iter().map(u32::to_string).collect();
        writeln!(file, "{}", ids.join(" "))?;
    }
    tracing::debug!("Wrote {} lines to '{}'", lines.len(), out.display());
    Ok(())
}
