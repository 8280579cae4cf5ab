// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — fine-tunes the classifier on a CSV dataset
//   2. `analyze` — loads the artifacts and classifies a text,
//                  printing {emotion, confidence,
//                  needs_immediate_help} as JSON
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{bail, Result};
use clap::Parser;
use commands::{AnalyzeArgs, Commands, TrainArgs};

use crate::application::{
    analyze_use_case::{AnalyzeConfig, AnalyzeUseCase},
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "emotion-finetune",
    version = "0.1.0",
    about = "Fine-tune a BERT encoder into an emotion classifier, then analyze text with it."
)]
pub struct Cli {
    /// The subcommand to run (train or analyze)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Analyze(args) => run_analyze(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    if !args.delimiter.is_ascii() {
        bail!("The delimiter must be a single ASCII character, got '{}'", args.delimiter);
    }
    tracing::info!("Starting training on: {}", args.dataset.display());
    let output_dir = args.output_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. Best val_acc={:.4} after {} epochs; artifacts in '{}'.",
        summary.state.best_val_accuracy,
        summary.state.epoch,
        output_dir.display(),
    );
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let use_case = AnalyzeUseCase::new(&AnalyzeConfig::from(&args));

    let analysis = use_case.handle(args.text.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
