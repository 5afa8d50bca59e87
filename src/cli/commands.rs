// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and their flags.
//
// Flags only pick directories (and, for `train`, an optional
// JSON config file). Every hyperparameter lives in RunConfig;
// `test` and `translate` reuse the one saved at training time.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → PathBuf, bool, etc.)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::config::RunConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build vocabularies and token-ID files from the raw corpus
    Prepare(PrepareArgs),

    /// Train the translation model
    Train(TrainArgs),

    /// Report the average BLEU of a checkpoint on the test split
    Test(ModelArgs),

    /// Translate sentences typed on stdin
    Translate(ModelArgs),
}

/// Arguments for the `prepare` command
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory holding train.<lang> and the test split
    #[arg(long)]
    pub data_dir: Option<String>,

    /// JSON file with RunConfig overrides (languages, prefixes, threshold)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the `train` command
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding the corpus, vocabularies and ID files
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Directory to save the checkpoint, config and metrics
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    /// JSON file with RunConfig overrides
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Continue from the checkpoint in checkpoint_dir, if there is one
    #[arg(long)]
    pub resume: bool,
}

/// Arguments for `test` and `translate`
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Directory the model was saved to by `train`
    #[arg(long, default_value = "model")]
    pub checkpoint_dir: PathBuf,

    /// Directory holding vocabularies and the test split (defaults to the one used in training)
    #[arg(long)]
    pub data_dir: Option<String>,
}

/// Start from the config file (or the defaults) and apply the directory flags.
pub fn resolve_config(
    config:         Option<&PathBuf>,
    data_dir:       Option<String>,
    checkpoint_dir: Option<String>,
) -> anyhow::Result<RunConfig> {
    let mut cfg = match config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(dir) = data_dir {
        cfg.data_dir = dir;
    }
    if let Some(dir) = checkpoint_dir {
        cfg.checkpoint_dir = dir;
    }
    Ok(cfg)
}
