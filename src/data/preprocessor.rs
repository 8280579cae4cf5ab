// ============================================================
// Layer 4 — Text Normalizer
// ============================================================
// Turns a raw dataset sentence into the normalised form the
// model is trained on. Steps (applied in order):
//
//   1. Lowercase
//   2. Drop every character that is not a-z or whitespace
//   3. Split into words on whitespace
//   4. Lemmatise each word (plural nouns → singular)
//   5. Re-join with single spaces
//
// Example:
//   "My cats were SO happy!!! :)"  →  "my cat were so happy"
//
// The normalizer owns its lemmatizer; there is no shared
// global instance to mutate.
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};

use crate::domain::record::{NormalizedRecord, RawRecord};
use crate::domain::traits::Lemmatizer;

pub struct Normalizer<L: Lemmatizer> {
    lemmatizer: L,
}

impl<L: Lemmatizer> Normalizer<L> {
    pub fn new(lemmatizer: L) -> Self {
        Self { lemmatizer }
    }

    /// Normalise a single string. May return an empty string.
    pub fn clean(&self, text: &str) -> String {
        let filtered: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
            .collect();

        filtered
            .split_whitespace()
            .map(|word| self.lemmatizer.lemmatize(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Normalise a dataset row. Rows with a missing field, or whose
    /// text cleans down to nothing, yield `None`.
    pub fn normalize(&self, record: &RawRecord) -> Option<NormalizedRecord> {
        let text    = record.text.as_deref()?;
        let emotion = record.emotion.as_deref()?;
        let cleaned = self.clean(text);
        if cleaned.is_empty() {
            return None;
        }
        Some(NormalizedRecord { text: cleaned, emotion: emotion.to_string() })
    }

    /// Normalise every row, dropping the ones that end up empty.
    pub fn normalize_all(&self, records: &[RawRecord]) -> Vec<NormalizedRecord> {
        let normalized: Vec<NormalizedRecord> = records
            .iter()
            .filter_map(|r| self.normalize(r))
            .collect();

        let dropped = records.len() - normalized.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} rows that were empty after cleaning", dropped);
        }
        normalized
    }
}

// ─── RuleLemmatizer ───────────────────────────────────────────────────────────
// Noun lemmatiser in the style of WordNet's morphological
// processor: look the word up in an exception table first,
// then try the regular plural suffix rules.
//
//   children → child      (exception)
//   studies  → study      (-ies  → -y)
//   classes  → class      (-sses → -ss)
//   boxes    → box        (-xes  → -x)
//   feelings → feeling    (-s    → "")
//   glass    → glass      (-ss is not a plural)

/// Irregular plurals that the suffix rules would get wrong.
const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men",      "man"),
    ("women",    "woman"),
    ("people",   "people"),
    ("feet",     "foot"),
    ("teeth",    "tooth"),
    ("geese",    "goose"),
    ("mice",     "mouse"),
    ("lives",    "life"),
    ("wives",    "wife"),
    ("knives",   "knife"),
    ("leaves",   "leaf"),
    ("selves",   "self"),
    ("thieves",  "thief"),
    ("wolves",   "wolf"),
    ("halves",   "half"),
    ("shelves",  "shelf"),
    ("loaves",   "loaf"),
    ("news",     "news"),
    ("series",   "series"),
    ("species",  "species"),
    ("always",   "always"),
    ("perhaps",  "perhaps"),
    ("sometimes", "sometimes"),
    ("nobody",   "nobody"),
    ("ourselves",  "ourselves"),
    ("yourselves", "yourselves"),
    ("themselves", "themselves"),
    ("towards",    "towards"),
    ("afterwards", "afterwards"),
    ("backwards",  "backwards"),
    ("forwards",   "forwards"),
    ("nowadays",   "nowadays"),
    ("sideways",   "sideways"),
    ("whereas",    "whereas"),
    ("canvas",     "canvas"),
    ("chaos",      "chaos"),
    ("lens",       "lens"),
    ("bias",       "bias"),
    ("does",       "does"),
    ("goes",       "go"),
    ("heroes",     "hero"),
    ("potatoes",   "potato"),
    ("tomatoes",   "tomato"),
    ("echoes",     "echo"),
];

/// Suffix rewrites, longest first.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("sses", "ss"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("ies",  "y"),
    ("xes",  "x"),
    ("zes",  "z"),
    ("s",    ""),
];

/// Endings that look plural but are not.
const NON_PLURAL_ENDINGS: &[&str] = &["ss", "us", "is", "ous"];

/// Words at or below this length are returned unchanged
/// ("is", "was", "has", "its" would otherwise be mangled).
const MIN_LEMMA_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct RuleLemmatizer {
    exceptions: HashMap<String, String>,
}

impl RuleLemmatizer {
    pub fn new() -> Self {
        let exceptions = IRREGULAR_NOUNS
            .iter()
            .map(|(w, l)| (w.to_string(), l.to_string()))
            .collect();
        Self { exceptions }
    }

    /// Extend the exception table from a WordNet-style `.exc` file:
    /// one `inflected base` pair per line, whitespace separated.
    pub fn with_exceptions_file(mut self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Cannot read lemma exceptions '{}'", path.display()))?;

        let mut added = 0usize;
        for line in contents.lines() {
            let mut parts = line.split_whitespace();
            if let (Some(word), Some(lemma)) = (parts.next(), parts.next()) {
                self.exceptions.insert(word.to_string(), lemma.to_string());
                added += 1;
            }
        }
        tracing::debug!("Loaded {} lemma exceptions from '{}'", added, path.display());
        Ok(self)
    }
}

impl Default for RuleLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer for RuleLemmatizer {
    fn lemmatize(&self, word: &str) -> String {
        if let Some(lemma) = self.exceptions.get(word) {
            return lemma.clone();
        }
        if word.len() <= MIN_LEMMA_LEN
            || NON_PLURAL_ENDINGS.iter().any(|e| word.ends_with(e))
        {
            return word.to_string();
        }

        for (suffix, replacement) in SUFFIX_RULES {
            if let Some(stem) = word.strip_suffix(suffix) {
                if stem.len() >= 2 {
                    return format!("{stem}{replacement}");
                }
            }
        }
        word.to_string()
    }
}
