// ============================================================
// Layer 5 — Fine-Tuning Policy
// ============================================================
// Decides which parts of the pretrained model are updated and
// at which learning rate. For a 12-block encoder:
//
//   sub-module         trainable   group        lr      wd
//   ─────────────────  ─────────   ──────────   ─────   ────
//   embeddings         no          —
//   blocks 0..=9       no          —
//   pooler             no (grad)   —
//   block 10           yes         block_10     5e-5    0.01
//   block 11           yes         block_11     1e-4    0.01
//   classifier head    yes         classifier   2e-4    0.01
//
// Frozen parameters are marked no-grad, so the backward pass
// never produces a gradient for them and no optimizer group
// ever sees them. The pooler is the exception: it has no group
// and is never stepped, but it keeps its gradient so it still
// counts towards the global gradient norm.
//
// Reference: Howard & Ruder (2018), discriminative fine-tuning

use std::fmt;

use burn::{module::Module, prelude::Backend};

use crate::ml::model::EmotionClassifier;

/// A named region of the classifier's parameter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamScope {
    Embeddings,
    Block(usize),
    Pooler,
    Classifier,
}

impl fmt::Display for ParamScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamScope::Embeddings => write!(f, "embeddings"),
            ParamScope::Block(i)   => write!(f, "block_{i}"),
            ParamScope::Pooler     => write!(f, "pooler"),
            ParamScope::Classifier => write!(f, "classifier"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    pub name:          String,
    pub scope:         ParamScope,
    pub trainable:     bool,
    pub learning_rate: f64,
    pub weight_decay:  f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FineTuningPolicy {
    /// Learning rate of the classification head
    pub head_lr: f64,
    /// Learning rates of the trainable blocks, topmost block first.
    /// Its length is the number of unfrozen blocks.
    pub block_lrs: Vec<f64>,
    pub weight_decay: f64,
}

impl Default for FineTuningPolicy {
    fn default() -> Self {
        Self {
            head_lr:      2e-4,
            block_lrs:    vec![1e-4, 5e-5],
            weight_decay: 0.01,
        }
    }
}

impl FineTuningPolicy {
    /// Index of the lowest trainable block for an encoder of `num_blocks`.
    fn first_trainable_block(&self, num_blocks: usize) -> usize {
        num_blocks.saturating_sub(self.block_lrs.len())
    }

    pub fn is_trainable(&self, scope: ParamScope, num_blocks: usize) -> bool {
        match scope {
            ParamScope::Embeddings | ParamScope::Pooler => false,
            ParamScope::Block(i)   => i >= self.first_trainable_block(num_blocks) && i < num_blocks,
            ParamScope::Classifier => true,
        }
    }

    /// Every scope of the model with its trainability and rate.
    /// Frozen scopes carry a learning rate of 0.
    pub fn describe(&self, num_blocks: usize) -> Vec<ParameterGroup> {
        let mut all = vec![self.frozen(ParamScope::Embeddings)];
        for i in 0..num_blocks {
            let scope = ParamScope::Block(i);
            if !self.is_trainable(scope, num_blocks) {
                all.push(self.frozen(scope));
            }
        }
        all.push(self.frozen(ParamScope::Pooler));
        all.extend(self.optimizer_groups(num_blocks));
        all
    }

    /// The groups handed to the optimizer: head first, then the
    /// trainable blocks from the top down.
    pub fn optimizer_groups(&self, num_blocks: usize) -> Vec<ParameterGroup> {
        let mut groups = vec![self.trainable(ParamScope::Classifier, self.head_lr)];
        for (offset, &lr) in self.block_lrs.iter().enumerate() {
            if let Some(i) = num_blocks.checked_sub(offset + 1) {
                groups.push(self.trainable(ParamScope::Block(i), lr));
            }
        }
        groups
    }

    /// Mark the embeddings and the frozen blocks as no-grad.
    pub fn apply<B: Backend>(&self, model: EmotionClassifier<B>) -> EmotionClassifier<B> {
        let num_blocks = model.encoder.num_layers();
        let first      = self.first_trainable_block(num_blocks);

        let EmotionClassifier { mut encoder, dropout, classifier } = model;
        encoder.embeddings = encoder.embeddings.no_grad();
        encoder.layers = encoder
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, block)| if i < first { block.no_grad() } else { block })
            .collect();

        tracing::info!(
            "Froze embeddings and blocks 0..{}; training blocks {}..{} and the classifier",
            first, first, num_blocks,
        );
        EmotionClassifier { encoder, dropout, classifier }
    }

    fn frozen(&self, scope: ParamScope) -> ParameterGroup {
        ParameterGroup {
            name:          scope.to_string(),
            scope,
            trainable:     false,
            learning_rate: 0.0,
            weight_decay:  0.0,
        }
    }

    fn trainable(&self, scope: ParamScope, learning_rate: f64) -> ParameterGroup {
        ParameterGroup {
            name:          scope.to_string(),
            scope,
            trainable:     true,
            learning_rate,
            weight_decay:  self.weight_decay,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_trainability_for_twelve_blocks() {
        let p = FineTuningPolicy::default();
        assert!(!p.is_trainable(ParamScope::Embeddings, 12));
        for i in 0..10 {
            assert!(!p.is_trainable(ParamScope::Block(i), 12), "block {i} should be frozen");
        }
        assert!(p.is_trainable(ParamScope::Block(10), 12));
        assert!(p.is_trainable(ParamScope::Block(11), 12));
        assert!(p.is_trainable(ParamScope::Classifier, 12));
    }

    #[test]
    fn test_exactly_three_optimizer_groups() {
        let groups = FineTuningPolicy::default().optimizer_groups(12);
        assert_eq!(groups.len(), 3);

        assert_eq!(groups[0].scope, ParamScope::Classifier);
        assert_eq!(groups[0].learning_rate, 2e-4);
        assert_eq!(groups[1].scope, ParamScope::Block(11));
        assert_eq!(groups[1].learning_rate, 1e-4);
        assert_eq!(groups[2].scope, ParamScope::Block(10));
        assert_eq!(groups[2].learning_rate, 5e-5);

        assert!(groups.iter().all(|g| g.trainable && g.weight_decay == 0.01));
    }

    #[test]
    fn test_describe_covers_every_scope() {
        let all = FineTuningPolicy::default().describe(12);
        // embeddings + 10 frozen blocks + pooler + 3 trainable groups
        assert_eq!(all.len(), 15);
        assert_eq!(all.iter().filter(|g| g.trainable).count(), 3);
        assert!(all.iter().filter(|g| !g.trainable).all(|g| g.learning_rate == 0.0));
    }

    #[test]
    fn test_apply_marks_frozen_params_no_grad() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(3).init(&device);
        let model = FineTuningPolicy::default().apply(model);

        assert!(!model.encoder.embeddings.word_embeddings.weight.is_require_grad());
        // no optimizer group, but its gradient feeds the clipping norm
        assert!(model.encoder.pooler.weight.is_require_grad());
        for i in 0..10 {
            assert!(!model.encoder.layers[i].ffn_linear1.weight.is_require_grad());
            assert!(!model.encoder.layers[i].ffn_linear2.weight.is_require_grad());
        }
        assert!(model.encoder.layers[10].ffn_linear1.weight.is_require_grad());
        assert!(model.encoder.layers[11].ffn_linear2.weight.is_require_grad());
        assert!(model.classifier.weight.is_require_grad());
    }

    #[test]
    fn test_small_encoder_does_not_underflow() {
        let groups = FineTuningPolicy::default().optimizer_groups(1);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].scope, ParamScope::Block(0));
    }
}
