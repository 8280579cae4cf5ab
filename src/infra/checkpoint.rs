// ============================================================
// Layer 6 — Checkpoint Selector + Manager
// ============================================================
// CheckpointSelector decides WHEN to persist: only when the
// validation accuracy is strictly greater than every earlier
// epoch's. Starting from best = 0:
//
//   val_acc:  0.60   0.55   0.60   0.72
//   persist:  yes    no     no     yes     (ties do not count)
//
// CheckpointManager decides HOW: every improving checkpoint
// gets its own directory, and a small pointer file names the
// current best one.
//
//   <output>/checkpoints/
//     epoch-001-acc-0.6000/
//       model.mpk.gz              ← CompactRecorder weights
//       classifier_config.json    ← architecture + num_labels
//       tokenizer.json
//     epoch-004-acc-0.7200/
//       ...
//     best.json                   ← {"epoch": 4, "val_accuracy": 0.72, "dir": "epoch-004-acc-0.7200"}
//
// A checkpoint is written into "<name>.partial" and renamed
// into place once complete; best.json is replaced by writing a
// temp file and renaming it. A run killed mid-save therefore
// never leaves best.json pointing at a half-written directory,
// and earlier checkpoints stay available for rollback.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::{EmotionClassifier, EmotionClassifierConfig};

const MODEL_FILE:  &str = "model";
const CONFIG_FILE: &str = "classifier_config.json";
const BEST_FILE:   &str = "best.json";

// ─── CheckpointSelector ───────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct CheckpointSelector {
    best_accuracy: f64,
}

impl CheckpointSelector {
    pub fn new() -> Self {
        Self { best_accuracy: 0.0 }
    }

    /// Record a validation accuracy. Returns true when it is a
    /// strict improvement and the model should be persisted.
    pub fn observe(&mut self, val_accuracy: f64) -> bool {
        if val_accuracy > self.best_accuracy {
            self.best_accuracy = val_accuracy;
            true
        } else {
            false
        }
    }

    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }
}

// ─── Pointer file ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:        usize,
    pub val_accuracy: f64,
    /// Directory name relative to the checkpoints directory
    pub dir:          String,
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Directory name for a checkpoint, e.g. "epoch-004-acc-0.7200".
    pub fn checkpoint_name(epoch: usize, val_accuracy: f64) -> String {
        format!("epoch-{epoch:03}-acc-{val_accuracy:.4}")
    }

    /// Persist model, architecture and tokenizer under a versioned
    /// directory, then point best.json at it.
    pub fn save<B: Backend>(
        &self,
        model:        &EmotionClassifier<B>,
        config:       &EmotionClassifierConfig,
        tokenizer:    &Tokenizer,
        epoch:        usize,
        val_accuracy: f64,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let name    = Self::checkpoint_name(epoch, val_accuracy);
        let staging = self.dir.join(format!("{name}.partial"));
        let target  = self.dir.join(&name);

        if staging.exists() {
            fs::remove_dir_all(&staging)
                .with_context(|| format!("Cannot clear '{}'", staging.display()))?;
        }
        fs::create_dir_all(&staging)
            .with_context(|| format!("Cannot create '{}'", staging.display()))?;

        let model_path = staging.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), model_path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", model_path.display()))?;

        let config_path = staging.join(CONFIG_FILE);
        config
            .save(&config_path)
            .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

        TokenizerStore::new(&staging).save(tokenizer)?;

        if target.exists() {
            fs::remove_dir_all(&target)
                .with_context(|| format!("Cannot replace '{}'", target.display()))?;
        }
        fs::rename(&staging, &target)
            .with_context(|| format!("Cannot move checkpoint into '{}'", target.display()))?;

        self.write_best(&BestCheckpoint { epoch, val_accuracy, dir: name })?;
        tracing::info!("Saved checkpoint '{}'", target.display());
        Ok(target)
    }

    fn write_best(&self, best: &BestCheckpoint) -> Result<()> {
        let tmp  = self.dir.join(format!("{BEST_FILE}.tmp"));
        let path = self.dir.join(BEST_FILE);
        fs::write(&tmp, serde_json::to_string_pretty(best)?)
            .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Cannot update '{}'", path.display()))?;
        Ok(())
    }

    /// Forget the best checkpoint of an earlier run. Versioned
    /// directories stay on disk; only the pointer is removed, so
    /// serving cannot pick up weights this run did not produce.
    pub fn clear_best(&self) -> Result<()> {
        let path = self.dir.join(BEST_FILE);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Cannot remove '{}'", path.display()))?;
            tracing::info!("Cleared previous best checkpoint pointer '{}'", path.display());
        }
        Ok(())
    }

    /// Read the pointer to the current best checkpoint.
    pub fn best(&self) -> Result<BestCheckpoint> {
        let path = self.dir.join(BEST_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Has a training run saved a checkpoint yet?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Directory of the current best checkpoint.
    pub fn best_dir(&self) -> Result<PathBuf> {
        Ok(self.dir.join(self.best()?.dir))
    }

    pub fn load_config(&self) -> Result<EmotionClassifierConfig> {
        let path = self.best_dir()?.join(CONFIG_FILE);
        EmotionClassifierConfig::load(&path)
            .map_err(|e| anyhow!("Cannot load '{}': {}", path.display(), e))
    }

    /// Rebuild the classifier from the best checkpoint.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<EmotionClassifier<B>> {
        let config = self.load_config()?;
        let path   = self.best_dir()?.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(config.init::<B>(device).load_record(record))
    }

    pub fn load_tokenizer(&self) -> Result<Tokenizer> {
        TokenizerStore::new(self.best_dir()?).load()
    }
}
