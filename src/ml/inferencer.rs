// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads the best checkpoint once and classifies single texts:
//
//   text → SampleEncoder → [1, max_length] ids + mask
//        → EmotionClassifier → logits [1, num_labels]
//        → softmax → (argmax id, its probability)
//
// Turning the id back into a label string is the caller's job;
// the label vocabulary lives next to the checkpoints.

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::encoder::SampleEncoder;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::EmotionClassifier;

pub type InferBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label_id:   usize,
    /// Softmax probability of `label_id`, in [0, 1]
    pub confidence: f64,
}

pub struct Inferencer<B: Backend> {
    model:   EmotionClassifier<B>,
    encoder: SampleEncoder,
    device:  B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: EmotionClassifier<B>, encoder: SampleEncoder, device: B::Device) -> Self {
        Self { model, encoder, device }
    }

    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        max_length:   usize,
        device:       B::Device,
    ) -> Result<Self> {
        let model     = ckpt_manager.load_model::<B>(&device)?;
        let tokenizer = ckpt_manager.load_tokenizer()?;
        let encoder   = SampleEncoder::new(tokenizer, max_length)?;
        tracing::info!("Model loaded from '{}'", ckpt_manager.best_dir()?.display());
        Ok(Self::new(model, encoder, device))
    }

    /// Class probabilities for one text, indexed by label id.
    pub fn probabilities(&self, text: &str) -> Result<Vec<f32>> {
        let (ids, mask) = self.encoder.encode_text(text)?;
        let seq_len = ids.len();

        let to_tensor = |values: Vec<u32>| {
            let flat: Vec<i32> = values.into_iter().map(|x| x as i32).collect();
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([1, seq_len])
        };

        let logits = self.model.forward(to_tensor(ids), to_tensor(mask));
        softmax(logits, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read class probabilities: {e:?}"))
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let probs = self.probabilities(text)?;
        let (label_id, confidence) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| anyhow!("The classifier produced no classes"))?;

        tracing::debug!("Predicted id={} conf={:.4} for '{}'", label_id, confidence, text);
        Ok(Prediction { label_id, confidence: f64::from(*confidence) })
    }
}
