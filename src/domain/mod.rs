// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the emotion
// classification problem. Nothing in here touches Burn,
// the filesystem, or the tokenizer.
//
//   record.rs     — RawRecord → NormalizedRecord → AugmentedRecord
//   labels.rs     — LabelVocabulary (the id ↔ label contract)
//   escalation.rs — the "needs immediate help" rule
//   traits.rs     — seams implemented by the data layer
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Dataset rows at each stage of the text pipeline
pub mod record;

// Dense label ids shared by training and serving
pub mod labels;

// Escalation rule for the high-risk class
pub mod escalation;

// Core abstractions (traits) that other layers implement
pub mod traits;
