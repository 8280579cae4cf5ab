// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the CSV file to tensor batches, in the
// order the training use case calls it:
//
//   dataset.csv
//       │
//       ▼
//   CsvLoader         → RawRecord rows (incomplete rows dropped)
//       │
//       ▼
//   Normalizer        → lowercase, filter, lemmatise
//       │
//       ▼
//   Augmenter         → original + word-drop + adjacent-swap
//       │
//       ▼
//   SampleEncoder     → token ids, attention mask, label id
//       │
//       ▼
//   stratified_split  → train / validation
//       │
//       ▼
//   EmotionDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   EmotionBatcher    → stacks samples into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the labelled CSV dataset
pub mod loader;

/// Text cleaning and lemmatisation
pub mod preprocessor;

/// Label-preserving data augmentation
pub mod augmenter;

/// Tokenises records into fixed-length samples
pub mod encoder;

/// Implements Burn's Dataset trait for emotion samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Class-stratified train/validation split
pub mod splitter;
