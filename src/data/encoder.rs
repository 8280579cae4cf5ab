// ============================================================
// Layer 4 — Sample Encoder
// ============================================================
// Converts augmented text + label into an EmotionSample:
//
//   "i feel sad", sad  →  input_ids:      [101, 1045, 2514, 6517, 102, 0, ...]
//                         attention_mask: [  1,    1,    1,    1,   1, 0, ...]
//                         label:          1
//
// The tokenizer is configured once for fixed-length output:
// sequences are truncated and padded to exactly max_length so
// the batcher can stack them without dynamic padding.
//
// Reference: tokenizers crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, Result};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::data::dataset::EmotionSample;
use crate::domain::{labels::LabelVocabulary, record::AugmentedRecord};

pub struct SampleEncoder {
    tokenizer:  Tokenizer,
    max_length: usize,
}

impl SampleEncoder {
    /// Take ownership of a tokenizer and fix its padding / truncation
    /// to `max_length`.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token: "[PAD]".to_string(),
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;

        Ok(Self { tokenizer, max_length })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenise one text. Special tokens ([CLS] / [SEP]) are added.
    pub fn encode_text(&self, text: &str) -> Result<(Vec<u32>, Vec<u32>)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok((enc.get_ids().to_vec(), enc.get_attention_mask().to_vec()))
    }

    pub fn encode(&self, record: &AugmentedRecord, labels: &LabelVocabulary) -> Result<EmotionSample> {
        let (input_ids, attention_mask) = self.encode_text(&record.text)?;
        Ok(EmotionSample {
            input_ids,
            attention_mask,
            label: labels.encode(&record.emotion)?,
        })
    }

    pub fn encode_all(
        &self,
        records: &[AugmentedRecord],
        labels:  &LabelVocabulary,
    ) -> Result<Vec<EmotionSample>> {
        records.iter().map(|r| self.encode(r, labels)).collect()
    }
}
