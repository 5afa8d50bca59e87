// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `prepare`   — build vocabularies and ID files
//   2. `train`     — train and checkpoint the model
//   3. `test`      — average BLEU on the test split
//   4. `translate` — interactive translation from stdin

pub mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use commands::{resolve_config, Commands, ModelArgs, PrepareArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "bucket-nmt",
    version = "0.1.0",
    about = "Train a bucketed seq2seq translation model, then evaluate it or translate with it."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)   => run_prepare(args),
            Commands::Train(args)     => run_train(args),
            Commands::Test(args)      => run_test(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let cfg = resolve_config(args.config.as_ref(), args.data_dir, None)?;
    let summary = PrepareUseCase::new(cfg).execute()?;
    println!(
        "Prepared {} ID files. Vocabulary sizes: {} source, {} target.",
        summary.files_written, summary.source_vocab_size, summary.target_vocab_size,
    );
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let mut cfg = resolve_config(args.config.as_ref(), args.data_dir, args.checkpoint_dir)?;
    cfg.resume |= args.resume;
    tracing::info!("Starting training on data in: {}", cfg.data_dir);

    let summary = TrainUseCase::new(cfg).execute()?;
    match summary.best_window_loss {
        Some(loss) => println!(
            "Training complete at iteration {}. Best window loss {:.4}. Checkpoint saved.",
            summary.iterations, loss,
        ),
        None => println!("Training complete at iteration {}. Checkpoint saved.", summary.iterations),
    }
    Ok(())
}

fn run_test(args: ModelArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;
    use crate::application::translate_use_case::load_translator;

    let (cfg, translator) = load_translator(&args.checkpoint_dir, args.data_dir.as_deref())?;
    let report = EvaluateUseCase::new(cfg, translator).execute()?;
    for line in &report.translations {
        println!("{line}");
    }
    println!(
        "Average BLEU: {:.4} over {} sentences ({} too long, skipped)",
        report.mean_bleu, report.retained, report.filtered,
    );
    Ok(())
}

fn run_translate(args: ModelArgs) -> Result<()> {
    use crate::application::translate_use_case::{load_translator, TranslateUseCase};

    let (_, translator) = load_translator(&args.checkpoint_dir, args.data_dir.as_deref())?;
    let stdin = io::stdin();
    let translated = TranslateUseCase::new(translator).run(stdin.lock(), io::stdout())?;
    tracing::info!("Translated {} sentences", translated);
    Ok(())
}
