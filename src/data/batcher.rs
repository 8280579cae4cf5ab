// ============================================================
// Layer 4 — Emotion Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<EmotionSample>
// into tensors for one forward pass.
//
//   Input:  N samples, each padded to S tokens
//   Output: input_ids [N, S], attention_mask [N, S], labels [N]
//
// All samples are already padded to max_length by the
// SampleEncoder, so stacking is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::EmotionSample;

/// A batch of encoded sentences ready for the classifier.
#[derive(Debug, Clone)]
pub struct EmotionBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Dense label ids — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct EmotionBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> EmotionBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<EmotionSample, EmotionBatch<B>> for EmotionBatcher<B> {
    fn batch(&self, items: Vec<EmotionSample>) -> EmotionBatch<B> {
        let batch_size = items.len();
        let seq_len    = items[0].input_ids.len();

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        EmotionBatch { input_ids, attention_mask, labels }
    }
}
