use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One model-ready example: padded token ids, the matching
/// attention mask, and the dense label id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

impl EmotionSample {
    /// Number of non-padding tokens
    pub fn token_count(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

pub struct EmotionDataset {
    samples: Vec<EmotionSample>,
}

impl EmotionDataset {
    pub fn new(samples: Vec<EmotionSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EmotionSample> for EmotionDataset {
    fn get(&self, index: usize) -> Option<EmotionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
