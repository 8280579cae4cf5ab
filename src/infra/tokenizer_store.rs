// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Saves and loads tokenizer.json inside a checkpoint
// directory, so every checkpoint carries the exact tokenizer
// (vocabulary, padding and truncation settings) it was
// trained with.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        let path = self.path();
        tokenizer
            .save(&path, false)
            .map_err(|e| anyhow!("Cannot save tokenizer to '{}': {}", path.display(), e))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }
}

/// Load a tokenizer.json from an arbitrary path.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::tests::word_level_tokenizer;

    #[test]
    fn test_save_then_load_encodes_identically() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok   = word_level_tokenizer();
        store.save(&tok).unwrap();

        let loaded = store.load().unwrap();
        let a = tok.encode("i feel sad", true).unwrap();
        let b = loaded.encode("i feel sad", true).unwrap();
        assert_eq!(a.get_ids(), b.get_ids());
    }

    #[test]
    fn test_missing_tokenizer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load().is_err());
    }
}
