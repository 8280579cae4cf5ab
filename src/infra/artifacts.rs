// ============================================================
// Layer 6 — Artifact Writer
// ============================================================
// Writes the files the serving process reads at startup,
// next to the checkpoints directory:
//
//   <output>/label_classes.json   ["happy","sad","suicidal"]
//   <output>/model_config.json    see ModelConfig below
//
// label_classes.json is written as soon as the vocabulary is
// built; model_config.json once the training loop has ended.
// Together with checkpoints/best.json they are the whole
// hand-off contract.
//
// Example model_config.json:
//   {
//     "model_name": "bert-base-uncased",
//     "num_labels": 3,
//     "max_length": 128,
//     "label_mapping": { "0": "happy", "1": "sad", "2": "suicidal" }
//   }

use anyhow::{bail, Context, Result};
use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};
use serde::{Deserialize, Serialize};

use crate::domain::labels::LabelVocabulary;

pub const LABELS_FILE:       &str = "label_classes.json";
pub const MODEL_CONFIG_FILE: &str = "model_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_name:    String,
    pub num_labels:    usize,
    pub max_length:    usize,
    /// id → label; serde_json writes the integer keys as strings
    pub label_mapping: BTreeMap<usize, String>,
}

impl ModelConfig {
    pub fn new(model_name: impl Into<String>, max_length: usize, labels: &LabelVocabulary) -> Self {
        Self {
            model_name:    model_name.into(),
            num_labels:    labels.len(),
            max_length,
            label_mapping: labels.id_to_label(),
        }
    }
}

pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn write_labels(&self, labels: &LabelVocabulary) -> Result<PathBuf> {
        self.write_json(LABELS_FILE, labels)
    }

    pub fn write_model_config(&self, config: &ModelConfig) -> Result<PathBuf> {
        self.write_json(MODEL_CONFIG_FILE, config)
    }

    pub fn read_labels(&self) -> Result<LabelVocabulary> {
        let classes: Vec<String> = self.read_json(LABELS_FILE)?;
        LabelVocabulary::from_classes(classes)
    }

    /// Read model_config.json and check it against label_classes.json.
    pub fn read_model_config(&self, labels: &LabelVocabulary) -> Result<ModelConfig> {
        let config: ModelConfig = self.read_json(MODEL_CONFIG_FILE)?;
        if config.label_mapping != labels.id_to_label() || config.num_labels != labels.len() {
            bail!(
                "'{}' and '{}' disagree on the label mapping",
                MODEL_CONFIG_FILE, LABELS_FILE
            );
        }
        Ok(config)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!("Wrote '{}'", path.display());
        Ok(path)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelVocabulary {
        LabelVocabulary::build(["sad", "happy", "suicidal"])
    }

    #[test]
    fn test_model_config_json_shape() {
        let config = ModelConfig::new("bert-base-uncased", 128, &labels());
        let value  = serde_json::to_value(&config).unwrap();
        assert_eq!(value["model_name"], "bert-base-uncased");
        assert_eq!(value["num_labels"], 3);
        assert_eq!(value["max_length"], 128);
        assert_eq!(value["label_mapping"]["0"], "happy");
        assert_eq!(value["label_mapping"]["2"], "suicidal");
    }

    #[test]
    fn test_labels_round_trip_through_disk() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        writer.write_labels(&labels()).unwrap();

        let raw = fs::read_to_string(dir.path().join(LABELS_FILE)).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["happy", "sad", "suicidal"]);
        assert_eq!(writer.read_labels().unwrap(), labels());
    }

    #[test]
    fn test_mismatched_config_is_rejected() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let other  = LabelVocabulary::build(["angry", "sad"]);
        writer.write_model_config(&ModelConfig::new("m", 16, &other)).unwrap();
        assert!(writer.read_model_config(&labels()).is_err());
    }

    #[test]
    fn test_empty_label_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LABELS_FILE), "[]").unwrap();
        assert!(ArtifactWriter::new(dir.path()).read_labels().is_err());
    }
}
