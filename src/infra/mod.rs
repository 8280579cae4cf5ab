// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the output directory:
//
//   checkpoint.rs      — when to persist (CheckpointSelector)
//                        and how (versioned CheckpointManager
//                        + best.json pointer)
//
//   artifacts.rs       — label_classes.json and
//                        model_config.json for the serving side
//
//   tokenizer_store.rs — tokenizer.json inside a checkpoint
//
//   metrics.rs         — per-epoch metrics.csv
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Checkpoint selection, saving and loading
pub mod checkpoint;

/// Serving hand-off artifacts
pub mod artifacts;

/// Tokenizer saving and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
