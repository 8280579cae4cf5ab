// ============================================================
// Layer 3 — Dataset Records
// ============================================================
// One struct per stage of the text pipeline:
//
//   RawRecord        — a row exactly as read from the CSV
//   NormalizedRecord — cleaned + lemmatised text, same label
//   AugmentedRecord  — one label-preserving variant of a
//                      NormalizedRecord
//
// Keeping the stages as distinct types means a function that
// expects normalised text cannot be handed a raw row by mistake.

use serde::{Deserialize, Serialize};

/// A row from the input file. Either field may be absent;
/// such rows are dropped by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub text:    Option<String>,
    pub emotion: Option<String>,
}

impl RawRecord {
    pub fn new(text: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            text:    Some(text.into()),
            emotion: Some(emotion.into()),
        }
    }
}

/// Text after lowercasing, character filtering and lemmatisation.
/// Never empty: records that clean down to nothing are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub text:    String,
    pub emotion: String,
}

/// One training example produced by the augmenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentedRecord {
    pub text:    String,
    pub emotion: String,
}

impl AugmentedRecord {
    pub fn new(text: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            text:    text.into(),
            emotion: emotion.into(),
        }
    }
}
