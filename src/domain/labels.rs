// ============================================================
// Layer 3 — Label Vocabulary
// ============================================================
// Maps emotion strings to dense ids 0..num_labels.
//
// Ids are the positions of the distinct labels in
// lexicographic order, so the same dataset always yields the
// same mapping no matter how its rows are ordered:
//
//   {"sad", "happy", "sad", "suicidal"}
//     → happy = 0, sad = 1, suicidal = 2
//
// The serving process rebuilds this exact ordering from
// label_classes.json; if the two ever disagree, predictions
// are silently attributed to the wrong emotion.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Ordered bijection between label ids and label strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    /// Index = label id
    classes: Vec<String>,
}

impl LabelVocabulary {
    /// Build from every label occurrence in the dataset (duplicates allowed).
    pub fn build<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: unique.into_iter().map(str::to_string).collect(),
        }
    }

    /// Rebuild from a persisted class list, rejecting lists that
    /// could not have come from `build` over a non-empty dataset.
    pub fn from_classes(classes: Vec<String>) -> Result<Self> {
        if classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(anyhow!(
                "label classes must be sorted and unique, got {:?}",
                classes
            ));
        }
        let vocab = Self { classes };
        if vocab.is_empty() {
            return Err(anyhow!("label classes must not be empty"));
        }
        Ok(vocab)
    }

    pub fn id_of(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    pub fn label_of(&self, id: usize) -> Option<&str> {
        self.classes.get(id).map(String::as_str)
    }

    /// Encode a label, failing if it was not seen when the vocabulary was built.
    pub fn encode(&self, label: &str) -> Result<usize> {
        self.id_of(label)
            .ok_or_else(|| anyhow!("label '{label}' is not in the vocabulary"))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// id → label, the shape written into model_config.json
    pub fn id_to_label(&self) -> BTreeMap<usize, String> {
        self.classes.iter().cloned().enumerate().collect()
    }
}
