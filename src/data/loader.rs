// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the labelled dataset from a delimited text file using
// the csv crate.
//
// Expected layout (header row required, extra columns ignored):
//
//   text,emotion
//   "I am good",happy
//   "I feel sad",sad
//
// Failure modes:
//   - unreadable file            → error (fatal for the run)
//   - `text` or `emotion` absent → error (fatal for the run)
//   - a row with an empty / missing field → skipped, counted
//   - a malformed row            → error with its line number
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{fs::File, path::PathBuf};

use crate::domain::record::RawRecord;
use crate::domain::traits::RecordSource;

/// Column names the dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 2] = ["text", "emotion"];

/// Loads RawRecords from a CSV (or other single-byte delimited) file.
pub struct CsvLoader {
    path:      PathBuf,
    delimiter: u8,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn read_from<R: std::io::Read>(&self, reader: R) -> Result<Vec<RawRecord>> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .with_context(|| format!("Cannot read header row of '{}'", self.path.display()))?
            .clone();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            bail!(
                "Dataset '{}' must contain columns {:?}; missing {:?}",
                self.path.display(),
                REQUIRED_COLUMNS,
                missing
            );
        }

        let mut records = Vec::new();
        let mut dropped = 0usize;

        for (row, result) in rdr.deserialize::<RawRecord>().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let record = result
                .with_context(|| format!("Malformed row at line {} of '{}'", row + 2, self.path.display()))?;

            let complete = record.text.as_deref().is_some_and(|t| !t.is_empty())
                && record.emotion.as_deref().is_some_and(|e| !e.is_empty());
            if complete {
                records.push(record);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            tracing::warn!("Dropped {} rows with a missing text or emotion", dropped);
        }
        Ok(records)
    }
}

impl RecordSource for CsvLoader {
    fn load_all(&self) -> Result<Vec<RawRecord>> {
        tracing::info!("Loading dataset from '{}'", self.path.display());
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open dataset '{}'", self.path.display()))?;
        let records = self.read_from(file)?;
        tracing::info!("Loaded {} rows", records.len());
        Ok(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_loads_rows() {
        let f    = write_csv("text,emotion\nI am good,happy\nI feel sad,sad\n");
        let rows = CsvLoader::new(f.path()).load_all().unwrap();
        assert_eq!(rows, vec![
            RawRecord::new("I am good", "happy"),
            RawRecord::new("I feel sad", "sad"),
        ]);
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let f    = write_csv("id,emotion,text\n1,happy,hello there\n");
        let rows = CsvLoader::new(f.path()).load_all().unwrap();
        assert_eq!(rows, vec![RawRecord::new("hello there", "happy")]);
    }

    #[test]
    fn test_drops_incomplete_rows() {
        let f    = write_csv("text,emotion\nfine,happy\n,sad\nno label,\n");
        let rows = CsvLoader::new(f.path()).load_all().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let f   = write_csv("text,label\nhello,happy\n");
        let err = CsvLoader::new(f.path()).load_all().unwrap_err();
        assert!(err.to_string().contains("emotion"));
    }

    #[test]
    fn test_padded_header_names_still_match() {
        let f    = write_csv("text, emotion \nI am good,happy\n");
        let rows = CsvLoader::new(f.path()).load_all().unwrap();
        assert_eq!(rows, vec![RawRecord::new("I am good", "happy")]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(CsvLoader::new("/definitely/not/here.csv").load_all().is_err());
    }

    #[test]
    fn test_custom_delimiter() {
        let f    = write_csv("text\temotion\nquite well\thappy\n");
        let rows = CsvLoader::new(f.path()).with_delimiter(b'\t').load_all().unwrap();
        assert_eq!(rows, vec![RawRecord::new("quite well", "happy")]);
    }
}
