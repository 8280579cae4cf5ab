// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `analyze`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, etc.)
//   - environment fallbacks for flags marked `env`
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;
use clap::{Args, Subcommand};

use crate::application::{analyze_use_case::AnalyzeConfig, train_use_case::TrainConfig};
use crate::domain::escalation::DEFAULT_THRESHOLD;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the pretrained encoder on a labelled CSV file
    Train(TrainArgs),

    /// Classify one text with the artifacts of a training run
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with `text` and `emotion` columns
    pub dataset: PathBuf,

    /// Where label_classes.json, model_config.json and the
    /// checkpoints are written
    #[arg(long, default_value = "model")]
    pub output_dir: PathBuf,

    /// Hugging Face id of the pretrained BERT model
    #[arg(long, default_value = "bert-base-uncased")]
    pub model_name: String,

    /// Tokens per input, after padding / truncation
    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Share of each class held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    /// Seeds augmentation, the split, the shuffle and weight init
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Field delimiter of the dataset file
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Extra irregular forms for the lemmatizer ("inflected base" per line)
    #[arg(long)]
    pub lemma_exceptions: Option<PathBuf>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_path:     a.dataset,
            output_dir:       a.output_dir,
            model_name:       a.model_name,
            max_length:       a.max_length,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            val_fraction:     a.val_fraction,
            seed:             a.seed,
            delimiter:        u8::try_from(a.delimiter).unwrap_or(b','),
            lemma_exceptions: a.lemma_exceptions,
        }
    }
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// The text to classify
    #[arg(long)]
    pub text: Option<String>,

    /// Output directory of a training run
    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    /// Confidence above which a "suicidal" prediction is escalated
    #[arg(long, env = "SUICIDAL_CONFIDENCE_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Lemmatizer exceptions file used at training time
    #[arg(long)]
    pub lemma_exceptions: Option<PathBuf>,
}

impl From<&AnalyzeArgs> for AnalyzeConfig {
    fn from(a: &AnalyzeArgs) -> Self {
        AnalyzeConfig {
            model_dir:        a.model_dir.clone(),
            threshold:        a.threshold,
            lemma_exceptions: a.lemma_exceptions.clone(),
        }
    }
}
