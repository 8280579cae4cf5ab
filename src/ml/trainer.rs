// ============================================================
// Layer 5 — Train / Validate Loop
// ============================================================
// One epoch = Train(epoch) → Validate(epoch):
//
//   Train     shuffled batches, for each batch:
//               forward → cross-entropy → backward
//               → split grads by parameter group
//               → clip the global grad norm to 1.0 (the pooler's
//                 gradient counts here, though no group steps it)
//               → one AdamW step per group at scheduler-scaled lr
//               → scheduler.step()
//
//   Validate  fixed order, model.valid() (dropout off, no graph)
//
// The train loader draws a fresh permutation on every iter(),
// so each epoch sees a new order; the validation loader never
// shuffles.
//
// Then the CheckpointSelector decides whether the sink persists
// the model.
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - Validation batcher must also use B::InnerBackend
//   - Each group's optimizer sees the whole model but only its
//     own gradients; parameters without a gradient are untouched
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use std::{marker::PhantomData, sync::Arc};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{EmotionBatch, EmotionBatcher},
    dataset::EmotionDataset,
};
use crate::infra::{checkpoint::CheckpointSelector, metrics::EpochMetrics};
use crate::ml::{
    model::{count_correct, EmotionClassifier},
    policy::{FineTuningPolicy, ParamScope},
    scheduler::LinearWarmupDecay,
};

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub epochs:        usize,
    pub batch_size:    usize,
    /// Seed of the per-epoch training shuffle
    pub seed:          u64,
    pub max_grad_norm: f64,
}

impl TrainerConfig {
    pub fn new(epochs: usize, batch_size: usize, seed: u64) -> Self {
        Self { epochs, batch_size, seed, max_grad_norm: 1.0 }
    }
}

/// Where the loop stands after the latest completed epoch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingState {
    pub epoch:             usize,
    pub best_val_accuracy: f64,
    pub scheduler_step:    usize,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub history: Vec<EpochMetrics>,
    pub state:   TrainingState,
}

/// Receives the results of the loop. The trainer owns the
/// model; the sink only borrows it to persist.
pub trait TrainingSink<B: AutodiffBackend> {
    fn epoch_finished(&mut self, _metrics: &EpochMetrics) -> Result<()> {
        Ok(())
    }

    /// Called only when the epoch strictly beats every earlier one.
    fn persist_best(&mut self, model: &EmotionClassifier<B>, metrics: &EpochMetrics) -> Result<()>;
}

pub struct Trainer {
    config: TrainerConfig,
    policy: FineTuningPolicy,
}

impl Trainer {
    pub fn new(config: TrainerConfig, policy: FineTuningPolicy) -> Self {
        Self { config, policy }
    }

    pub fn fit<B: AutodiffBackend, S: TrainingSink<B>>(
        &self,
        model:         EmotionClassifier<B>,
        train_dataset: EmotionDataset,
        val_dataset:   EmotionDataset,
        device:        &B::Device,
        sink:          &mut S,
    ) -> Result<(EmotionClassifier<B>, TrainingSummary)> {
        let cfg = &self.config;
        if cfg.batch_size == 0 || cfg.epochs == 0 {
            bail!("batch_size and epochs must both be at least 1");
        }
        if train_dataset.sample_count() == 0 {
            bail!("The training split is empty");
        }
        if val_dataset.sample_count() == 0 {
            bail!("The validation split is empty; add more rows per class or raise the validation fraction");
        }

        // ── Freeze + parameter groups ────────────────────────────────────────
        let mut model  = self.policy.apply(model);
        let num_blocks = model.encoder.num_layers();
        let groups     = self.policy.optimizer_groups(num_blocks);
        for g in &groups {
            tracing::info!("Param group '{}': lr={:e} wd={}", g.name, g.learning_rate, g.weight_decay);
        }

        // ── One AdamW per group ──────────────────────────────────────────────
        let mut optimizers: Vec<_> = groups
            .iter()
            .map(|g| {
                AdamWConfig::new()
                    .with_weight_decay(g.weight_decay as f32)
                    .with_epsilon(1e-8)
                    .init::<B, EmotionClassifier<B>>()
            })
            .collect();

        // ── Scheduler ────────────────────────────────────────────────────────
        let train_len       = train_dataset.sample_count();
        let steps_per_epoch = train_len.div_ceil(cfg.batch_size);
        let mut scheduler   = LinearWarmupDecay::for_epochs(steps_per_epoch, cfg.epochs);
        tracing::info!(
            "{} train / {} val samples, {} steps per epoch, warmup {} of {} steps",
            train_len, val_dataset.sample_count(), steps_per_epoch,
            scheduler.warmup_steps(), scheduler.total_steps(),
        );

        // ── Data loaders ─────────────────────────────────────────────────────
        let (train_loader, val_loader) = build_loaders::<B>(cfg, train_dataset, val_dataset, device);

        let mut selector = CheckpointSelector::new();
        let mut state    = TrainingState::default();
        let mut history  = Vec::with_capacity(cfg.epochs);

        // ── Epoch loop ───────────────────────────────────────────────────────
        for epoch in 1..=cfg.epochs {

            // ── Train ────────────────────────────────────────────────────────
            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;
            let mut correct  = 0usize;
            let mut total    = 0usize;

            for batch in train_loader.iter() {
                let labels = batch.labels.clone();
                total += labels.dims()[0];

                let (loss, logits) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);
                loss_sum += loss.clone().into_scalar().elem::<f64>();
                batches  += 1;
                correct  += count_correct(logits, labels);

                let mut grads = loss.backward();
                let mut group_grads: Vec<GradientsParams> = groups
                    .iter()
                    .map(|g| grads_for_scope(g.scope, &mut grads, &model))
                    .collect();

                // pooler: part of the norm, never stepped
                group_grads.push(grads_for_scope(ParamScope::Pooler, &mut grads, &model));
                let norm = clip_global_norm(&model, &mut group_grads, cfg.max_grad_norm);
                group_grads.pop();
                tracing::debug!("step {} grad_norm={:.4} lr_mult={:.4}", scheduler.current_step(), norm, scheduler.multiplier());

                for ((group, optim), grads) in groups.iter().zip(optimizers.iter_mut()).zip(group_grads) {
                    model = optim.step(scheduler.scaled(group.learning_rate), model, grads);
                }
                scheduler.step();
            }

            let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
            let train_acc  = if total   > 0 { correct as f64 / total as f64 } else { 0.0 };

            // ── Validate ─────────────────────────────────────────────────────
            let model_valid = model.valid();

            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;
            let mut correct  = 0usize;
            let mut total    = 0usize;

            for batch in val_loader.iter() {
                let labels = batch.labels.clone();
                total += labels.dims()[0];

                let (loss, logits) = model_valid.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);
                loss_sum += loss.into_scalar().elem::<f64>();
                batches  += 1;
                correct  += count_correct(logits, labels);
            }

            let val_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
            let val_acc  = if total   > 0 { correct as f64 / total as f64 } else { 0.0 };

            let metrics = EpochMetrics::new(epoch, train_loss, train_acc, val_loss, val_acc);
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
                epoch, cfg.epochs, train_loss, train_acc * 100.0, val_loss, val_acc * 100.0,
            );
            sink.epoch_finished(&metrics)?;

            if selector.observe(val_acc) {
                tracing::info!("Validation accuracy improved to {:.4}", val_acc);
                sink.persist_best(&model, &metrics)?;
            }

            state = TrainingState {
                epoch,
                best_val_accuracy: selector.best_accuracy(),
                scheduler_step:    scheduler.current_step(),
            };
            history.push(metrics);
        }

        tracing::info!("Training complete! Best val_acc={:.4}", state.best_val_accuracy);
        Ok((model, TrainingSummary { history, state }))
    }
}

/// Training batches come out in a new order on every iteration;
/// validation batches always keep the dataset order.
fn build_loaders<B: AutodiffBackend>(
    cfg:    &TrainerConfig,
    train:  EmotionDataset,
    val:    EmotionDataset,
    device: &B::Device,
) -> (
    Arc<dyn DataLoader<EmotionBatch<B>>>,
    Arc<dyn DataLoader<EmotionBatch<B::InnerBackend>>>,
) {
    let train_loader = DataLoaderBuilder::new(EmotionBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    let val_loader = DataLoaderBuilder::new(EmotionBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val);

    (train_loader, val_loader)
}

/// Pull the gradients of one parameter group out of the backward pass.
fn grads_for_scope<B: AutodiffBackend>(
    scope: ParamScope,
    grads: &mut B::Gradients,
    model: &EmotionClassifier<B>,
) -> GradientsParams {
    match scope {
        ParamScope::Classifier => GradientsParams::from_module(grads, &model.classifier),
        ParamScope::Pooler     => GradientsParams::from_module(grads, &model.encoder.pooler),
        ParamScope::Embeddings => GradientsParams::from_module(grads, &model.encoder.embeddings),
        ParamScope::Block(i)   => match model.encoder.layers.get(i) {
            Some(block) => GradientsParams::from_module(grads, block),
            None        => GradientsParams::new(),
        },
    }
}

// ─── Global gradient norm ─────────────────────────────────────────────────────
//   norm = sqrt( Σ_groups Σ_params Σ g² )
//   if norm > max: every g *= max / (norm + 1e-6)

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads:   &'a GradientsParams,
    sum:     f64,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct ScaleGrads<'a, B: AutodiffBackend> {
    grads:   &'a mut GradientsParams,
    factor:  f64,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for ScaleGrads<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm over the gradients of every group together.
pub fn global_grad_norm<B: AutodiffBackend>(model: &EmotionClassifier<B>, grads: &[GradientsParams]) -> f64 {
    grads
        .iter()
        .map(|g| {
            let mut visitor = SquaredNorm::<B> { grads: g, sum: 0.0, backend: PhantomData };
            model.visit(&mut visitor);
            visitor.sum
        })
        .sum::<f64>()
        .sqrt()
}

/// Rescale all groups so the global norm is at most `max_norm`.
/// Returns the norm before clipping.
pub fn clip_global_norm<B: AutodiffBackend>(
    model:    &EmotionClassifier<B>,
    grads:    &mut [GradientsParams],
    max_norm: f64,
) -> f64 {
    let norm = global_grad_norm(model, grads);
    let coef = max_norm / (norm + 1e-6);
    if coef < 1.0 {
        for g in grads.iter_mut() {
            let mut visitor = ScaleGrads::<B> { grads: g, factor: coef, backend: PhantomData };
            model.visit(&mut visitor);
        }
    }
    norm
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::EmotionSample;
    use crate::ml::model::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[derive(Default)]
    struct RecordingSink {
        finished:  Vec<usize>,
        persisted: Vec<usize>,
    }

    impl<B: AutodiffBackend> TrainingSink<B> for RecordingSink {
        fn epoch_finished(&mut self, metrics: &EpochMetrics) -> Result<()> {
            self.finished.push(metrics.epoch);
            Ok(())
        }

        fn persist_best(&mut self, _model: &EmotionClassifier<B>, metrics: &EpochMetrics) -> Result<()> {
            self.persisted.push(metrics.epoch);
            Ok(())
        }
    }

    fn sample(ids: [u32; 3], label: usize) -> EmotionSample {
        let mut input_ids = vec![2];
        input_ids.extend(ids);
        input_ids.extend([3, 0]);
        EmotionSample { input_ids, attention_mask: vec![1, 1, 1, 1, 1, 0], label }
    }

    fn toy_datasets() -> (EmotionDataset, EmotionDataset) {
        let train = vec![
            sample([4, 5, 6], 0), sample([4, 7, 6], 0), sample([4, 5, 12], 0),
            sample([4, 7, 8], 1), sample([9, 10, 11], 1),
        ];
        let val = vec![sample([4, 5, 6], 0), sample([4, 7, 8], 1)];
        (EmotionDataset::new(train), EmotionDataset::new(val))
    }

    #[test]
    fn test_fit_runs_every_epoch_and_steps_scheduler() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(2).init(&device);
        let (train, val) = toy_datasets();

        let trainer = Trainer::new(TrainerConfig::new(3, 2, 42), FineTuningPolicy::default());
        let mut sink = RecordingSink::default();
        let (_, summary) = trainer.fit(model, train, val, &device, &mut sink).unwrap();

        assert_eq!(summary.history.len(), 3);
        assert_eq!(sink.finished, vec![1, 2, 3]);
        // 5 samples / batch 2 → 3 steps per epoch
        assert_eq!(summary.state.scheduler_step, 9);
        assert_eq!(summary.state.epoch, 3);
        for m in &summary.history {
            assert!(m.train_loss.is_finite());
            assert!((0.0..=1.0).contains(&m.val_acc));
        }
    }

    #[test]
    fn test_persists_only_on_strict_improvement() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(2).init(&device);
        let (train, val) = toy_datasets();

        let trainer = Trainer::new(TrainerConfig::new(4, 2, 7), FineTuningPolicy::default());
        let mut sink = RecordingSink::default();
        let (_, summary) = trainer.fit(model, train, val, &device, &mut sink).unwrap();

        let mut best = 0.0;
        let expected: Vec<usize> = summary
            .history
            .iter()
            .filter(|m| {
                let improved = m.val_acc > best;
                if improved { best = m.val_acc; }
                improved
            })
            .map(|m| m.epoch)
            .collect();
        assert_eq!(sink.persisted, expected);
        assert_eq!(summary.state.best_val_accuracy, best);
    }

    #[test]
    fn test_frozen_params_do_not_move() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(2).init(&device);
        let embeddings_before = model.encoder.embeddings.word_embeddings.weight.val().into_data();
        let block0_before     = model.encoder.layers[0].ffn_linear1.weight.val().into_data();
        let pooler_before     = model.encoder.pooler.weight.val().into_data();
        let head_before       = model.classifier.weight.val().into_data();
        let (train, val) = toy_datasets();

        let trainer = Trainer::new(TrainerConfig::new(2, 2, 42), FineTuningPolicy::default());
        let (model, _) = trainer.fit(model, train, val, &device, &mut RecordingSink::default()).unwrap();

        model.encoder.embeddings.word_embeddings.weight.val().into_data().assert_eq(&embeddings_before, true);
        model.encoder.layers[0].ffn_linear1.weight.val().into_data().assert_eq(&block0_before, true);
        model.encoder.pooler.weight.val().into_data().assert_eq(&pooler_before, true);
        assert_ne!(
            model.classifier.weight.val().into_data().to_vec::<f32>().unwrap(),
            head_before.to_vec::<f32>().unwrap(),
        );
    }

    #[test]
    fn test_train_order_changes_between_epochs_validation_does_not() {
        let device = Default::default();
        let samples = || -> EmotionDataset {
            EmotionDataset::new((0..16).map(|label| sample([4, 5, 6], label)).collect())
        };
        let cfg = TrainerConfig::new(2, 16, 42);
        let (train_loader, val_loader) = build_loaders::<TestBackend>(&cfg, samples(), samples(), &device);

        let labels_of_train = || -> Vec<_> {
            train_loader.iter().map(|b| b.labels.into_data()).collect()
        };
        let first  = labels_of_train();
        let second = labels_of_train();
        assert_ne!(first, second);

        let labels_of_val = || -> Vec<_> {
            val_loader.iter().map(|b| b.labels.into_data()).collect()
        };
        let first  = labels_of_val();
        let second = labels_of_val();
        assert_eq!(first, second);
        let expected: Vec<i64> = (0..16).collect();
        assert_eq!(first[0].clone().convert::<i64>().to_vec::<i64>().unwrap(), expected);
    }

    #[test]
    fn test_pooler_gradient_counts_towards_global_norm() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(2).init(&device);
        let model = FineTuningPolicy::default().apply(model);
        let (train, _) = toy_datasets();
        let batch = burn::data::dataloader::batcher::Batcher::batch(
            &EmotionBatcher::<TestBackend>::new(device),
            (0..train.sample_count()).filter_map(|i| burn::data::dataset::Dataset::get(&train, i)).collect(),
        );

        let (loss, _) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);
        let mut grads = loss.backward();
        let head   = grads_for_scope(ParamScope::Classifier, &mut grads, &model);
        let pooler = grads_for_scope(ParamScope::Pooler, &mut grads, &model);
        assert!(!pooler.is_empty());

        let without = global_grad_norm(&model, std::slice::from_ref(&head));
        let with    = global_grad_norm(&model, &[head, pooler]);
        assert!(with > without, "pooler added nothing: {with} vs {without}");
    }

    #[test]
    fn test_empty_validation_split_is_rejected() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(2).init(&device);
        let (train, _) = toy_datasets();

        let trainer = Trainer::new(TrainerConfig::new(1, 2, 42), FineTuningPolicy::default());
        let result = trainer.fit(model, train, EmotionDataset::new(vec![]), &device, &mut RecordingSink::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_clip_global_norm_bounds_gradients() {
        let device = Default::default();
        let model: EmotionClassifier<TestBackend> = tiny_config(2).init(&device);
        let (train, _) = toy_datasets();
        let batch = burn::data::dataloader::batcher::Batcher::batch(
            &EmotionBatcher::<TestBackend>::new(device),
            (0..train.sample_count()).filter_map(|i| burn::data::dataset::Dataset::get(&train, i)).collect(),
        );

        let (loss, _) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);
        let mut grads = loss.backward();
        let mut group_grads = vec![
            GradientsParams::from_module(&mut grads, &model.classifier),
            GradientsParams::from_module(&mut grads, &model.encoder.layers[11]),
        ];

        let before = clip_global_norm(&model, &mut group_grads, 1e-3);
        assert!(before > 1e-3);
        let after = global_grad_norm(&model, &group_grads);
        assert!((after - 1e-3).abs() < 1e-4, "norm after clipping was {after}");
    }
}
