// ============================================================
// Layer 5 — Learning-Rate Scheduler
// ============================================================
// Linear warmup followed by linear decay, stepped once per
// optimizer update:
//
//   multiplier
//     1.0 ┤        ╱╲
//         │      ╱    ╲
//         │    ╱        ╲
//         │  ╱            ╲
//     0.0 ┼╱────────────────╲──▶ step
//         0   warmup       total
//
//   warmup_steps = steps_per_epoch * WARMUP_EPOCHS
//   total_steps  = steps_per_epoch * epochs
//
// Each parameter group's base learning rate is multiplied by
// the current value.

/// Epochs spent warming up.
pub const WARMUP_EPOCHS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearWarmupDecay {
    warmup_steps: usize,
    total_steps:  usize,
    step:         usize,
}

impl LinearWarmupDecay {
    pub fn new(warmup_steps: usize, total_steps: usize) -> Self {
        Self { warmup_steps, total_steps, step: 0 }
    }

    pub fn for_epochs(steps_per_epoch: usize, epochs: usize) -> Self {
        Self::new(steps_per_epoch * WARMUP_EPOCHS, steps_per_epoch * epochs)
    }

    pub fn warmup_steps(&self) -> usize { self.warmup_steps }

    pub fn total_steps(&self) -> usize { self.total_steps }

    /// Number of optimizer updates taken so far.
    pub fn current_step(&self) -> usize { self.step }

    /// Multiplier at an arbitrary step.
    pub fn multiplier_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return step as f64 / self.warmup_steps as f64;
        }
        if step >= self.total_steps {
            return 0.0;
        }
        let remaining = (self.total_steps - step) as f64;
        let decay_len = (self.total_steps - self.warmup_steps) as f64;
        (remaining / decay_len).max(0.0)
    }

    /// Multiplier for the next optimizer update.
    pub fn multiplier(&self) -> f64 {
        self.multiplier_at(self.step)
    }

    /// Scale a base learning rate by the current multiplier.
    pub fn scaled(&self, base_lr: f64) -> f64 {
        base_lr * self.multiplier()
    }

    /// Advance after an optimizer update.
    pub fn step(&mut self) {
        self.step += 1;
    }
}
