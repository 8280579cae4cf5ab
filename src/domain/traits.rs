// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits; the
// data and ml layers provide the implementations:
//
//   RecordSource    ← CsvLoader
//   Lemmatizer      ← RuleLemmatizer
//   EmotionAnalyzer ← AnalyzeUseCase
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::escalation::Analysis;
use crate::domain::record::RawRecord;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled rows.
pub trait RecordSource {
    /// Load every row. Fails if the source is unreadable or
    /// does not have the required columns.
    fn load_all(&self) -> Result<Vec<RawRecord>>;
}

// ─── Lemmatizer ───────────────────────────────────────────────────────────────
/// Reduces a single lowercase word to its dictionary base form.
///
/// Implementations are constructed explicitly and passed to the
/// normalizer; there is no process-wide instance.
pub trait Lemmatizer {
    fn lemmatize(&self, word: &str) -> String;
}

// ─── EmotionAnalyzer ──────────────────────────────────────────────────────────
/// Any component that can classify a piece of text.
pub trait EmotionAnalyzer {
    fn analyze(&self, text: &str) -> Result<Analysis>;
}
