// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1:  Load the CSV dataset             (Layer 4 - data)
//   Step 2:  Fetch the pretrained model files (Layer 5 - ml)
//   Step 3:  Normalise, augment, build labels,
//            encode                           (Layer 4 - data)
//   Step 4:  Write label_classes.json         (Layer 6 - infra)
//   Step 5:  Stratified train/val split       (Layer 4 - data)
//   Step 6:  Save train_config.json           (Layer 6 - infra)
//   Step 7:  Load encoder + fresh head        (Layer 5 - ml)
//   Step 8:  Run the training loop            (Layer 5 - ml)
//   Step 9:  Write model_config.json          (Layer 6 - infra)
//
// The label vocabulary is built from the whole augmented set
// before the split, so both splits (and the serving side)
// share one id ↔ label mapping.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};
use burn::{prelude::*, tensor::backend::AutodiffBackend};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::{
    augmenter::Augmenter,
    dataset::{EmotionDataset, EmotionSample},
    encoder::SampleEncoder,
    loader::CsvLoader,
    preprocessor::{Normalizer, RuleLemmatizer},
    splitter::stratified_split,
};
use crate::domain::{
    labels::LabelVocabulary,
    record::{AugmentedRecord, RawRecord},
    traits::{Lemmatizer, RecordSource},
};
use crate::infra::{
    artifacts::{ArtifactWriter, ModelConfig},
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    tokenizer_store::load_tokenizer,
};
use crate::ml::{
    model::{EmotionClassifier, EmotionClassifierConfig},
    policy::FineTuningPolicy,
    pretrained::{self, HfBertConfig},
    trainer::{Trainer, TrainerConfig, TrainingSink, TrainingSummary},
};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

const TRAIN_CONFIG_FILE: &str = "train_config.json";
const CHECKPOINTS_DIR:   &str = "checkpoints";

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run depends on. Saved next to the artifacts so a
// run can be reproduced from its output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_path:     PathBuf,
    pub output_dir:       PathBuf,
    /// Hugging Face model id of the pretrained encoder
    pub model_name:       String,
    pub max_length:       usize,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub val_fraction:     f64,
    pub seed:             u64,
    pub delimiter:        u8,
    /// Optional WordNet-style `.exc` file for the lemmatizer
    pub lemma_exceptions: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_path:     PathBuf::from("data/emotions.csv"),
            output_dir:       PathBuf::from("model"),
            model_name:       "bert-base-uncased".to_string(),
            max_length:       128,
            batch_size:       16,
            epochs:           10,
            val_fraction:     0.2,
            seed:             42,
            delimiter:        b',',
            lemma_exceptions: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 || self.batch_size == 0 || self.max_length < 2 {
            bail!("epochs and batch_size must be at least 1 and max_length at least 2");
        }
        if !(0.0..1.0).contains(&self.val_fraction) || self.val_fraction == 0.0 {
            bail!("val_fraction must lie in (0, 1), got {}", self.val_fraction);
        }
        Ok(())
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        let path = dir.join(TRAIN_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(path)
    }
}

// ─── Example preparation ──────────────────────────────────────────────────────
/// The encoded training set and the vocabulary it was encoded with.
#[derive(Debug, Clone)]
pub struct PreparedExamples {
    pub labels:  LabelVocabulary,
    pub samples: Vec<EmotionSample>,
}

/// Raw rows → normalised → augmented → label ids → encoded samples.
pub fn prepare_examples<L: Lemmatizer, R: Rng>(
    raw:        &[RawRecord],
    normalizer: &Normalizer<L>,
    augmenter:  &mut Augmenter<R>,
    encoder:    &SampleEncoder,
) -> Result<PreparedExamples> {
    let normalized = normalizer.normalize_all(raw);
    if normalized.is_empty() {
        bail!("No rows left after normalisation; nothing to train on");
    }

    let augmented = augmenter.augment_all(&normalized);
    let labels    = LabelVocabulary::build(augmented.iter().map(|r| r.emotion.as_str()));
    if labels.len() < 2 {
        tracing::warn!("Only {} emotion class in the dataset", labels.len());
    }
    log_class_distribution(&augmented);

    let samples = encoder.encode_all(&augmented, &labels)?;
    Ok(PreparedExamples { labels, samples })
}

fn log_class_distribution(records: &[AugmentedRecord]) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        *counts.entry(r.emotion.as_str()).or_default() += 1;
    }
    tracing::info!("Class distribution after augmentation:");
    for (label, n) in counts {
        tracing::info!("  {:<16} {}", label, n);
    }
}

// ─── Checkpoint sink ──────────────────────────────────────────────────────────
/// Persists what the training loop reports: every epoch to
/// metrics.csv, every improving model to a new checkpoint.
/// Opening a sink starts a new run in `output_dir`: metrics.csv
/// is truncated and the best pointer of any earlier run is cleared.
pub struct CheckpointSink {
    checkpoints: CheckpointManager,
    metrics:     MetricsLogger,
    config:      EmotionClassifierConfig,
    tokenizer:   Tokenizer,
}

impl CheckpointSink {
    pub fn new(
        output_dir: &Path,
        config:     EmotionClassifierConfig,
        tokenizer:  Tokenizer,
    ) -> Result<Self> {
        let checkpoints = CheckpointManager::new(output_dir.join(CHECKPOINTS_DIR));
        checkpoints.clear_best()?;
        Ok(Self {
            checkpoints,
            metrics:     MetricsLogger::new(output_dir)?,
            config,
            tokenizer,
        })
    }
}

impl<B: AutodiffBackend> TrainingSink<B> for CheckpointSink {
    fn epoch_finished(&mut self, metrics: &EpochMetrics) -> Result<()> {
        self.metrics.log(metrics)
    }

    fn persist_best(&mut self, model: &EmotionClassifier<B>, metrics: &EpochMetrics) -> Result<()> {
        self.checkpoints
            .save(model, &self.config, &self.tokenizer, metrics.epoch, metrics.val_acc)
            .map(|_| ())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;
        cfg.validate()?;
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        // ── Step 1: Load the dataset ──────────────────────────────────────────
        tracing::info!("Loading dataset from '{}'", cfg.dataset_path.display());
        let raw = CsvLoader::new(&cfg.dataset_path)
            .with_delimiter(cfg.delimiter)
            .load_all()?;
        tracing::info!("Loaded {} rows", raw.len());

        // ── Step 2: Pretrained model files ────────────────────────────────────
        let files       = pretrained::download(&cfg.model_name)?;
        let hf_config   = HfBertConfig::from_file(&files.config_path)?;
        let encoder_cfg = hf_config.to_encoder_config();
        if cfg.max_length > encoder_cfg.max_position_embeddings {
            bail!(
                "max_length {} exceeds the {} positions of '{}'",
                cfg.max_length, encoder_cfg.max_position_embeddings, cfg.model_name
            );
        }

        // ── Step 3: Normalise → augment → labels → encode ─────────────────────
        let mut lemmatizer = RuleLemmatizer::new();
        if let Some(path) = &cfg.lemma_exceptions {
            lemmatizer = lemmatizer.with_exceptions_file(path)?;
        }
        let normalizer    = Normalizer::new(lemmatizer);
        let mut augmenter = Augmenter::new(&mut rng);
        let encoder       = SampleEncoder::new(load_tokenizer(&files.tokenizer_path)?, cfg.max_length)?;

        let PreparedExamples { labels, samples } =
            prepare_examples(&raw, &normalizer, &mut augmenter, &encoder)?;
        tracing::info!("{} classes: {:?}", labels.len(), labels.classes());

        // ── Step 4: Label mapping for the serving side ────────────────────────
        let artifacts = ArtifactWriter::new(&cfg.output_dir);
        artifacts.write_labels(&labels)?;

        // ── Step 5: Stratified split ──────────────────────────────────────────
        let (train_samples, val_samples) =
            stratified_split(samples, |s| s.label, cfg.val_fraction, &mut rng);
        tracing::info!("Split: {} train, {} validation", train_samples.len(), val_samples.len());

        // ── Step 6: Save run config ───────────────────────────────────────────
        cfg.save(&cfg.output_dir)?;

        // ── Step 7: Model ─────────────────────────────────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        TrainBackend::seed(cfg.seed);

        let classifier_cfg = EmotionClassifierConfig::new(encoder_cfg.clone(), labels.len())
            .with_dropout(encoder_cfg.dropout);
        let pretrained_encoder =
            pretrained::load_encoder::<TrainBackend>(&encoder_cfg, &files.weights_path, &device)?;
        let model = classifier_cfg.init_with_encoder(pretrained_encoder, &device);

        // ── Step 8: Train ─────────────────────────────────────────────────────
        let trainer = Trainer::new(
            TrainerConfig::new(cfg.epochs, cfg.batch_size, cfg.seed),
            FineTuningPolicy::default(),
        );
        let mut sink = CheckpointSink::new(&cfg.output_dir, classifier_cfg, encoder.tokenizer().clone())?;
        let (_, summary) = trainer.fit(
            model,
            EmotionDataset::new(train_samples),
            EmotionDataset::new(val_samples),
            &device,
            &mut sink,
        )?;

        // ── Step 9: Serving config ────────────────────────────────────────────
        artifacts.write_model_config(&ModelConfig::new(&cfg.model_name, cfg.max_length, &labels))?;

        if summary.state.best_val_accuracy == 0.0 {
            tracing::warn!("Validation accuracy never rose above 0; no checkpoint was saved");
        }
        Ok(summary)
    }
}
