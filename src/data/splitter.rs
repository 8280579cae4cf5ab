// ============================================================
// Layer 4 — Stratified Train/Validation Splitter
// ============================================================
// Splits samples into training and validation sets so that
// every class keeps (as closely as integer counts allow) the
// same proportion in both sets.
//
// Per class c with n_c samples:
//   n_val(c) = round(n_c * val_fraction), capped at n_c - 1
//   so every class with at least one sample is present in
//   the training set.
//
// Within each class the samples are shuffled with the
// injected RNG before the cut, so the split is reproducible
// for a fixed seed and row order.
//
// Reference: rand crate documentation (SliceRandom)

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};

/// Split `samples` into (train, validation), stratified by `label_of`.
pub fn stratified_split<T, R, F>(
    samples:      Vec<T>,
    label_of:     F,
    val_fraction: f64,
    rng:          &mut R,
) -> (Vec<T>, Vec<T>)
where
    R: Rng,
    F: Fn(&T) -> usize,
{
    let total = samples.len();

    // BTreeMap keeps class iteration order stable across runs
    let mut by_class: BTreeMap<usize, Vec<T>> = BTreeMap::new();
    for s in samples {
        by_class.entry(label_of(&s)).or_default().push(s);
    }

    let mut train = Vec::with_capacity(total);
    let mut val   = Vec::new();

    for (label, mut members) in by_class {
        members.shuffle(rng);

        let n     = members.len();
        let n_val = ((n as f64) * val_fraction).round() as usize;
        let n_val = n_val.min(n.saturating_sub(1));
        if n_val == 0 && val_fraction > 0.0 {
            tracing::warn!(
                "Class {} has only {} samples; none held out for validation",
                label, n
            );
        }

        let held_out = members.split_off(n - n_val);
        train.extend(members);
        val.extend(held_out);
    }

    // Interleave classes in the training set; validation order
    // stays grouped by class, which is fine for evaluation.
    train.shuffle(rng);

    tracing::debug!(
        "Stratified split: {} training, {} validation",
        train.len(),
        val.len(),
    );

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn count(items: &[(usize, usize)], label: usize) -> usize {
        items.iter().filter(|(l, _)| *l == label).count()
    }

    #[test]
    fn test_preserves_class_proportions() {
        // 80 of class 0, 20 of class 1
        let items: Vec<(usize, usize)> = (0..100)
            .map(|i| (if i < 80 { 0 } else { 1 }, i))
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let (train, val) = stratified_split(items, |x| x.0, 0.2, &mut rng);

        assert_eq!(val.len(), 20);
        assert_eq!(count(&val, 0), 16);
        assert_eq!(count(&val, 1), 4);
        assert_eq!(count(&train, 0), 64);
        assert_eq!(count(&train, 1), 16);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<(usize, usize)> = (0..57).map(|i| (i % 3, i)).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (train, val) = stratified_split(items, |x| x.0, 0.2, &mut rng);

        let mut ids: Vec<usize> = train.iter().chain(val.iter()).map(|x| x.1).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..57).collect::<Vec<_>>());
    }

    #[test]
    fn test_singleton_classes_stay_in_training() {
        let items = vec![(0usize, 0usize), (1, 1)];
        let mut rng = StdRng::seed_from_u64(0);
        let (train, val) = stratified_split(items, |x| x.0, 0.2, &mut rng);
        assert_eq!(train.len(), 2);
        assert!(val.is_empty());
    }

    #[test]
    fn test_same_seed_same_split() {
        let items: Vec<(usize, usize)> = (0..40).map(|i| (i % 2, i)).collect();
        let a = stratified_split(items.clone(), |x| x.0, 0.25, &mut StdRng::seed_from_u64(9));
        let b = stratified_split(items,         |x| x.0, 0.25, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<(usize, usize)> = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);
        let (train, val) = stratified_split(items, |x| x.0, 0.2, &mut rng);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
