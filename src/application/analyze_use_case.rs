// ============================================================
// Layer 2 — Analyze Use Case
// ============================================================
// The serving side of the artifact bundle. Everything is loaded
// once into an immutable AnalyzeContext:
//
//   <model_dir>/label_classes.json   → LabelVocabulary
//   <model_dir>/model_config.json    → max_length (checked against labels)
//   <model_dir>/checkpoints/best.json → weights + tokenizer
//
// A request then runs:
//
//   text → Normalizer (same cleaning as training)
//        → Inferencer → (id, confidence)
//        → label string → escalation rule
//
// Request failures map onto three kinds of AnalyzeError. The
// internal one always shows the same message; the cause only
// goes to the log.

use anyhow::{bail, Result};
use std::{fmt, path::PathBuf};
use burn::prelude::Backend;

use crate::data::preprocessor::{Normalizer, RuleLemmatizer};
use crate::domain::{
    escalation::{Analysis, DEFAULT_THRESHOLD},
    labels::LabelVocabulary,
    traits::EmotionAnalyzer,
};
use crate::infra::{artifacts::ArtifactWriter, checkpoint::CheckpointManager};
use crate::ml::inferencer::{InferBackend, Inferencer};

const CHECKPOINTS_DIR: &str = "checkpoints";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeConfig {
    pub model_dir:        PathBuf,
    pub threshold:        f64,
    /// Same exceptions file the training run used, if any
    pub lemma_exceptions: Option<PathBuf>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            model_dir:        PathBuf::from("model"),
            threshold:        DEFAULT_THRESHOLD,
            lemma_exceptions: None,
        }
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    /// No (or blank) text in the request
    MissingText,
    /// The artifact bundle could not be loaded at startup
    ModelNotLoaded,
    /// Anything else; the cause has already been logged
    Internal,
}

impl AnalyzeError {
    /// HTTP-style status for callers that wrap this in a service.
    pub fn status_code(&self) -> u16 {
        match self {
            AnalyzeError::MissingText    => 400,
            AnalyzeError::ModelNotLoaded => 500,
            AnalyzeError::Internal       => 500,
        }
    }
}

impl fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzeError::MissingText    => write!(f, "No text provided"),
            AnalyzeError::ModelNotLoaded => write!(f, "Model not loaded, please check server logs."),
            AnalyzeError::Internal       => write!(f, "Internal server error analyzing sentiment."),
        }
    }
}

impl std::error::Error for AnalyzeError {}

// ─── AnalyzeContext ───────────────────────────────────────────────────────────
/// Everything a request needs, loaded once and only ever borrowed.
pub struct AnalyzeContext<B: Backend = InferBackend> {
    labels:     LabelVocabulary,
    normalizer: Normalizer<RuleLemmatizer>,
    inferencer: Inferencer<B>,
    threshold:  f64,
}

impl<B: Backend> AnalyzeContext<B> {
    pub fn new(
        labels:     LabelVocabulary,
        normalizer: Normalizer<RuleLemmatizer>,
        inferencer: Inferencer<B>,
        threshold:  f64,
    ) -> Self {
        Self { labels, normalizer, inferencer, threshold }
    }

    pub fn load(config: &AnalyzeConfig, device: B::Device) -> Result<Self> {
        let artifacts    = ArtifactWriter::new(&config.model_dir);
        let labels       = artifacts.read_labels()?;
        let model_config = artifacts.read_model_config(&labels)?;

        let checkpoints = CheckpointManager::new(config.model_dir.join(CHECKPOINTS_DIR));
        let classifier  = checkpoints.load_config()?;
        if classifier.num_labels != labels.len() {
            bail!(
                "Checkpoint '{}' has {} output classes but the label file has {}",
                checkpoints.best_dir()?.display(), classifier.num_labels, labels.len(),
            );
        }
        let inferencer  = Inferencer::from_checkpoint(&checkpoints, model_config.max_length, device)?;

        let mut lemmatizer = RuleLemmatizer::new();
        if let Some(path) = &config.lemma_exceptions {
            lemmatizer = lemmatizer.with_exceptions_file(path)?;
        }

        tracing::info!(
            "Loaded '{}' fine-tune with {} classes, threshold {}",
            model_config.model_name, labels.len(), config.threshold,
        );
        Ok(Self::new(labels, Normalizer::new(lemmatizer), inferencer, config.threshold))
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one text and apply the escalation rule.
    pub fn analyze(&self, text: &str) -> Result<Analysis> {
        // Serving input gets the training-time cleaning; fall back
        // to the raw text when cleaning leaves nothing.
        let cleaned = self.normalizer.clean(text);
        let input   = if cleaned.is_empty() { text } else { cleaned.as_str() };

        let prediction = self.inferencer.predict(input)?;
        let emotion = self
            .labels
            .label_of(prediction.label_id)
            .ok_or_else(|| anyhow::anyhow!(
                "Predicted id {} is outside the {} known labels",
                prediction.label_id, self.labels.len()
            ))?;

        Ok(Analysis::new(emotion, prediction.confidence, self.threshold))
    }
}

// ─── AnalyzeUseCase ───────────────────────────────────────────────────────────
pub struct AnalyzeUseCase<B: Backend = InferBackend> {
    context: Option<AnalyzeContext<B>>,
}

impl AnalyzeUseCase<InferBackend> {
    /// Load the bundle on the default WGPU device. A failed load is
    /// logged and every later request answers ModelNotLoaded.
    pub fn new(config: &AnalyzeConfig) -> Self {
        let device = burn::backend::wgpu::WgpuDevice::default();
        match AnalyzeContext::load(config, device) {
            Ok(context) => Self::with_context(Some(context)),
            Err(e) => {
                tracing::error!("Error loading model from '{}': {:#}", config.model_dir.display(), e);
                Self::with_context(None)
            }
        }
    }
}

impl<B: Backend> AnalyzeUseCase<B> {
    pub fn with_context(context: Option<AnalyzeContext<B>>) -> Self {
        Self { context }
    }

    pub fn is_ready(&self) -> bool {
        self.context.is_some()
    }

    /// Handle one request whose text may be absent.
    pub fn handle(&self, text: Option<&str>) -> std::result::Result<Analysis, AnalyzeError> {
        let context = self.context.as_ref().ok_or_else(|| {
            tracing::error!("analyze called but the model is not loaded");
            AnalyzeError::ModelNotLoaded
        })?;

        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(AnalyzeError::MissingText),
        };

        context.analyze(text).map_err(|e| {
            tracing::error!("Internal server error: {:#}", e);
            AnalyzeError::Internal
        })
    }
}

impl<B: Backend> EmotionAnalyzer for AnalyzeUseCase<B> {
    fn analyze(&self, text: &str) -> Result<Analysis> {
        Ok(self.handle(Some(text))?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::{tests::word_level_tokenizer, SampleEncoder};
    use crate::infra::artifacts::ModelConfig;
    use crate::ml::model::{tests::tiny_config, EmotionClassifier};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn labels() -> LabelVocabulary {
        LabelVocabulary::build(["happy", "sad", "suicidal"])
    }

    fn context(threshold: f64) -> AnalyzeContext<TestBackend> {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(3).init(&device);
        let encoder = SampleEncoder::new(word_level_tokenizer(), 8).unwrap();
        AnalyzeContext::new(
            labels(),
            Normalizer::new(RuleLemmatizer::new()),
            Inferencer::new(model, encoder, device),
            threshold,
        )
    }

    #[test]
    fn test_analysis_uses_known_label_and_rule() {
        let use_case = AnalyzeUseCase::with_context(Some(context(0.0)));
        let result = use_case.handle(Some("I want to die")).unwrap();

        assert!(labels().id_of(&result.emotion).is_some());
        assert!((0.0..=1.0).contains(&result.confidence));
        // threshold 0 → escalation follows the label alone
        assert_eq!(result.needs_immediate_help, result.emotion == "suicidal");
    }

    #[test]
    fn test_missing_text_is_a_client_error() {
        let use_case = AnalyzeUseCase::with_context(Some(context(0.75)));
        assert_eq!(use_case.handle(None), Err(AnalyzeError::MissingText));
        assert_eq!(use_case.handle(Some("   ")), Err(AnalyzeError::MissingText));
        assert_eq!(AnalyzeError::MissingText.status_code(), 400);
    }

    #[test]
    fn test_unloaded_model_is_a_server_error() {
        let use_case = AnalyzeUseCase::<TestBackend>::with_context(None);
        assert!(!use_case.is_ready());
        assert_eq!(use_case.handle(Some("hello")), Err(AnalyzeError::ModelNotLoaded));
        assert_eq!(AnalyzeError::ModelNotLoaded.status_code(), 500);
    }

    #[test]
    fn test_internal_error_message_is_fixed() {
        assert_eq!(
            AnalyzeError::Internal.to_string(),
            "Internal server error analyzing sentiment."
        );
    }

    #[test]
    fn test_load_fails_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AnalyzeConfig { model_dir: dir.path().to_path_buf(), ..AnalyzeConfig::default() };
        assert!(AnalyzeContext::<TestBackend>::load(&cfg, Default::default()).is_err());
    }

    #[test]
    fn test_load_from_artifact_bundle() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = tiny_config(3);
        let model: EmotionClassifier<TestBackend> = config.init(&device);

        let writer = ArtifactWriter::new(dir.path());
        writer.write_labels(&labels()).unwrap();
        writer.write_model_config(&ModelConfig::new("tiny", 8, &labels())).unwrap();
        CheckpointManager::new(dir.path().join(CHECKPOINTS_DIR))
            .save(&model, &config, &word_level_tokenizer(), 1, 0.9)
            .unwrap();

        let cfg = AnalyzeConfig { model_dir: dir.path().to_path_buf(), ..AnalyzeConfig::default() };
        let context = AnalyzeContext::<TestBackend>::load(&cfg, device).unwrap();
        assert_eq!(context.threshold(), 0.75);

        let use_case = AnalyzeUseCase::with_context(Some(context));
        let analysis = EmotionAnalyzer::analyze(&use_case, "I am so happy!").unwrap();
        assert!(labels().id_of(&analysis.emotion).is_some());
    }

    #[test]
    fn test_load_rejects_checkpoint_with_other_class_count() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        // checkpoint left by a two-class run
        let stale  = tiny_config(2);
        let model: EmotionClassifier<TestBackend> = stale.init(&device);
        CheckpointManager::new(dir.path().join(CHECKPOINTS_DIR))
            .save(&model, &stale, &word_level_tokenizer(), 3, 0.8)
            .unwrap();

        let writer = ArtifactWriter::new(dir.path());
        writer.write_labels(&labels()).unwrap();
        writer.write_model_config(&ModelConfig::new("tiny", 8, &labels())).unwrap();

        let cfg = AnalyzeConfig { model_dir: dir.path().to_path_buf(), ..AnalyzeConfig::default() };
        let err = AnalyzeContext::<TestBackend>::load(&cfg, device).err().unwrap();
        assert!(err.to_string().contains("2 output classes"));
    }
}
