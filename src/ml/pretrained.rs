// ============================================================
// Layer 5 — Pretrained Encoder Loading
// ============================================================
// Fetches a BERT checkpoint from the Hugging Face Hub and maps
// its weights onto TextEncoder:
//
//   config.json        → TextEncoderConfig (architecture)
//   tokenizer.json     → tokenizers::Tokenizer
//   pytorch_model.bin  → TextEncoderRecord (weights)
//
// Files are cached under ~/.cache/huggingface/hub/ by hf-hub.
//
// PyTorch key                                  TextEncoder key
// ───────────────────────────────────────────  ─────────────────────────────
// bert.embeddings.LayerNorm.weight              embeddings.layer_norm.weight
// bert.encoder.layer.3.attention.self.query.*   layers.3.self_attn.query.*
// bert.encoder.layer.3.attention.output.dense.* layers.3.self_attn.output.*
// bert.encoder.layer.3.attention.output.LayerNorm.*  layers.3.norm1.*
// bert.encoder.layer.3.intermediate.dense.*     layers.3.ffn_linear1.*
// bert.encoder.layer.3.output.dense.*           layers.3.ffn_linear2.*
// bert.encoder.layer.3.output.LayerNorm.*       layers.3.norm2.*
// bert.pooler.dense.*                           pooler.*
//
// Keys with no counterpart (cls.predictions.*, position_ids)
// are ignored by the recorder.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use serde::Deserialize;

use crate::ml::model::{TextEncoder, TextEncoderConfig, TextEncoderRecord};

const CONFIG_FILE:    &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE:   &str = "pytorch_model.bin";

/// Applied in order to every key of the PyTorch state dict.
const KEY_REMAPS: [(&str, &str); 11] = [
    (r"LayerNorm\.gamma$", "LayerNorm.weight"),
    (r"LayerNorm\.beta$",  "LayerNorm.bias"),
    (r"^bert\.", ""),
    (r"^embeddings\.LayerNorm", "embeddings.layer_norm"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)", "layers.$1.self_attn.$2"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense", "layers.$1.self_attn.output"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm", "layers.$1.norm1"),
    (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense", "layers.$1.ffn_linear1"),
    (r"^encoder\.layer\.([0-9]+)\.output\.dense", "layers.$1.ffn_linear2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm", "layers.$1.norm2"),
    (r"^pooler\.dense", "pooler"),
];

/// The subset of a Hugging Face BERT config.json we need.
#[derive(Debug, Clone, Deserialize)]
pub struct HfBertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size:         usize,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob:     f64,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps:          f64,
}

fn default_type_vocab_size() -> usize { 2 }
fn default_dropout()         -> f64   { 0.1 }
fn default_layer_norm_eps()  -> f64   { 1e-12 }

impl HfBertConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a BERT config", path.display()))
    }

    pub fn to_encoder_config(&self) -> TextEncoderConfig {
        TextEncoderConfig::new(
            self.vocab_size,
            self.max_position_embeddings,
            self.type_vocab_size,
            self.hidden_size,
            self.num_attention_heads,
            self.num_hidden_layers,
            self.intermediate_size,
        )
        .with_dropout(self.hidden_dropout_prob)
        .with_layer_norm_eps(self.layer_norm_eps)
    }
}

/// Local paths of a downloaded pretrained model.
#[derive(Debug, Clone)]
pub struct PretrainedFiles {
    pub config_path:    PathBuf,
    pub tokenizer_path: PathBuf,
    pub weights_path:   PathBuf,
}

/// Download (or reuse from cache) the files of `model_name`.
pub fn download(model_name: &str) -> Result<PretrainedFiles> {
    tracing::info!("Fetching '{}' from the Hugging Face Hub", model_name);
    let api  = hf_hub::api::sync::Api::new().context("Failed to initialise the Hugging Face Hub API")?;
    let repo = api.model(model_name.to_string());

    let fetch = |file: &str| {
        repo.get(file)
            .with_context(|| format!("Failed to download '{file}' for '{model_name}'"))
    };
    Ok(PretrainedFiles {
        config_path:    fetch(CONFIG_FILE)?,
        tokenizer_path: fetch(TOKENIZER_FILE)?,
        weights_path:   fetch(WEIGHTS_FILE)?,
    })
}

/// Build a TextEncoder and fill it with the checkpoint weights.
pub fn load_encoder<B: Backend>(
    config:       &TextEncoderConfig,
    weights_path: &Path,
    device:       &B::Device,
) -> Result<TextEncoder<B>> {
    let args = KEY_REMAPS
        .iter()
        .fold(LoadArgs::new(weights_path.to_path_buf()), |args, (from, to)| {
            args.with_key_remap(from, to)
        });

    let record: TextEncoderRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .with_context(|| format!("Cannot load weights from '{}'", weights_path.display()))?;

    let encoder = config.init::<B>(device).load_record(record);
    tracing::info!(
        "Loaded pretrained encoder: {} blocks, hidden={}",
        config.num_layers, config.hidden_size,
    );
    Ok(encoder)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const BERT_BASE_CONFIG: &str = r#"{
        "architectures": ["BertForMaskedLM"],
        "attention_probs_dropout_prob": 0.1,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "hidden_size": 768,
        "initializer_range": 0.02,
        "intermediate_size": 3072,
        "layer_norm_eps": 1e-12,
        "max_position_embeddings": 512,
        "model_type": "bert",
        "num_attention_heads": 12,
        "num_hidden_layers": 12,
        "pad_token_id": 0,
        "type_vocab_size": 2,
        "vocab_size": 30522
    }"#;

    #[test]
    fn test_bert_base_config_maps_to_encoder() {
        let hf: HfBertConfig = serde_json::from_str(BERT_BASE_CONFIG).unwrap();
        let cfg = hf.to_encoder_config();
        assert_eq!(cfg.vocab_size, 30522);
        assert_eq!(cfg.hidden_size, 768);
        assert_eq!(cfg.num_layers, 12);
        assert_eq!(cfg.num_heads, 12);
        assert_eq!(cfg.intermediate_size, 3072);
        assert_eq!(cfg.max_position_embeddings, 512);
        assert_eq!(cfg.type_vocab_size, 2);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let json = r#"{
            "vocab_size": 100, "hidden_size": 8, "num_hidden_layers": 2,
            "num_attention_heads": 2, "intermediate_size": 16,
            "max_position_embeddings": 32
        }"#;
        let hf: HfBertConfig = serde_json::from_str(json).unwrap();
        assert_eq!(hf.type_vocab_size, 2);
        assert_eq!(hf.layer_norm_eps, 1e-12);
    }

    #[test]
    fn test_config_from_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, BERT_BASE_CONFIG).unwrap();
        assert_eq!(HfBertConfig::from_file(&path).unwrap().num_hidden_layers, 12);
        assert!(HfBertConfig::from_file(&dir.path().join("missing.json")).is_err());
    }
}
