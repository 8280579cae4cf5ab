// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model code. The data layer only
// touches Burn through the Dataset/Batcher traits, and the
// infra layer only through records.
//
// What's in this layer:
//
//   model.rs      — BERT-style encoder + classification head
//                   • word / position / token-type embeddings
//                   • post-norm self-attention blocks (GELU FFN)
//                   • tanh pooler over [CLS]
//                   • dropout + linear head → num_labels
//
//   pretrained.rs — config.json → encoder config, and PyTorch
//                   weights → encoder record (key remapping)
//
//   policy.rs     — which sub-modules train, at which rate
//
//   scheduler.rs  — linear warmup / linear decay multiplier
//
//   trainer.rs    — the epoch loop: grouped AdamW, global
//                   gradient clipping, validation, selection
//
//   inferencer.rs — best checkpoint → softmax prediction
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Encoder + classification head
pub mod model;

/// Hugging Face checkpoint loading
pub mod pretrained;

/// Layer freezing and parameter groups
pub mod policy;

/// Learning-rate schedule
pub mod scheduler;

/// Train / validate loop
pub mod trainer;

/// Inference engine — loads checkpoint and predicts an emotion
pub mod inferencer;
