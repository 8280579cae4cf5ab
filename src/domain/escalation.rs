// ============================================================
// Layer 3 — Escalation Rule
// ============================================================
// A prediction is escalated when the model says "suicidal"
// with a confidence strictly above the configured threshold.
// A confidence exactly equal to the threshold is not escalated.

use serde::{Deserialize, Serialize};

/// The class that triggers escalation.
pub const ESCALATION_LABEL: &str = "suicidal";

/// Default threshold used by the serving process.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// The result handed back to callers of the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub emotion:              String,
    pub confidence:           f64,
    pub needs_immediate_help: bool,
}

impl Analysis {
    pub fn new(emotion: impl Into<String>, confidence: f64, threshold: f64) -> Self {
        let emotion = emotion.into();
        let needs_immediate_help = needs_immediate_help(&emotion, confidence, threshold);
        Self { emotion, confidence, needs_immediate_help }
    }
}

pub fn needs_immediate_help(emotion: &str, confidence: f64, threshold: f64) -> bool {
    emotion == ESCALATION_LABEL && confidence > threshold
}
