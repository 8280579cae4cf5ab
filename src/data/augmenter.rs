// ============================================================
// Layer 4 — Data Augmenter
// ============================================================
// Expands one normalised example into several label-preserving
// variants so the classifier sees small perturbations of each
// sentence.
//
// Output for a text with more than SHORT_TEXT_WORDS words:
//
//   1. the original text, unmodified
//   2. word-drop:     one uniformly chosen word removed
//   3. adjacent-swap: a single pass that swaps neighbours
//
// Texts of SHORT_TEXT_WORDS words or fewer come back as a single
// variant (the original); dropping a word from "i feel sad"
// would remove most of what it says.
//
// Adjacent-swap semantics:
//   A swap decision is drawn for every position i in 0..n-1
//   against the ORIGINAL sequence (probability SWAP_PROBABILITY).
//   A chosen position is applied only when neither i nor i+1
//   was already claimed by an earlier applied swap, and the
//   swaps are applied to a fresh copy. A word therefore moves at
//   most one place, and the number of RNG draws is always n-1.
//
//   words:     a  b  c  d  e
//   chosen:    ✓  ✓  .  ✓          (position 1 overlaps 0 → skipped)
//   result:    b  a  c  e  d
//
// Randomness is injected by the caller so runs are reproducible.
//
// Reference: rand crate documentation (Rng, SliceRandom)

use rand::Rng;

use crate::domain::record::{AugmentedRecord, NormalizedRecord};

/// Texts with this many words or fewer are never perturbed.
pub const SHORT_TEXT_WORDS: usize = 3;

/// Chance that any given position swaps with its right neighbour.
pub const SWAP_PROBABILITY: f64 = 0.30;

pub struct Augmenter<R: Rng> {
    rng: R,
}

impl<R: Rng> Augmenter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Return the ordered variants of `text`. The first variant is
    /// always `text` itself.
    pub fn variants(&mut self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= SHORT_TEXT_WORDS {
            return vec![text.to_string()];
        }

        let dropped = self.word_drop(&words);
        let swapped = self.adjacent_swap(&words);
        vec![text.to_string(), dropped, swapped]
    }

    /// Expand one record; every variant keeps the record's label.
    pub fn augment(&mut self, record: &NormalizedRecord) -> Vec<AugmentedRecord> {
        self.variants(&record.text)
            .into_iter()
            .map(|text| AugmentedRecord::new(text, record.emotion.clone()))
            .collect()
    }

    pub fn augment_all(&mut self, records: &[NormalizedRecord]) -> Vec<AugmentedRecord> {
        let augmented: Vec<AugmentedRecord> = records
            .iter()
            .flat_map(|r| self.augment(r))
            .collect();

        tracing::info!(
            "Augmented {} records into {} examples",
            records.len(),
            augmented.len()
        );
        augmented
    }

    fn word_drop(&mut self, words: &[&str]) -> String {
        let remove_idx = self.rng.gen_range(0..words.len());
        words
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != remove_idx)
            .map(|(_, w)| *w)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn adjacent_swap(&mut self, words: &[&str]) -> String {
        let decisions: Vec<bool> = (0..words.len() - 1)
            .map(|_| self.rng.gen_bool(SWAP_PROBABILITY))
            .collect();
        apply_swaps(words, &decisions).join(" ")
    }
}

/// Apply the chosen swaps to a copy of `words`. `decisions[i]` asks
/// for position i to swap with i+1; overlapping requests are resolved
/// left to right, the earlier one wins.
fn apply_swaps<'a>(words: &[&'a str], decisions: &[bool]) -> Vec<&'a str> {
    let mut out       = words.to_vec();
    let mut last_used = None::<usize>;

    for (i, &swap) in decisions.iter().enumerate() {
        let overlaps = last_used.is_some_and(|j| j + 1 >= i);
        if swap && !overlaps {
            out.swap(i, i + 1);
            last_used = Some(i);
        }
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn augmenter(seed: u64) -> Augmenter<StdRng> {
        Augmenter::new(StdRng::seed_from_u64(seed))
    }

    fn sorted_words(s: &str) -> Vec<&str> {
        let mut w: Vec<&str> = s.split_whitespace().collect();
        w.sort_unstable();
        w
    }

    #[test]
    fn test_short_texts_are_untouched() {
        let mut a = augmenter(0);
        for text in ["sad", "i feel sad", "i am good", "not ok"] {
            assert_eq!(a.variants(text), vec![text.to_string()]);
        }
    }

    #[test]
    fn test_long_texts_get_three_variants() {
        let text = "i really do not feel good today";
        for seed in 0..20 {
            let v = augmenter(seed).variants(text);
            assert_eq!(v.len(), 3);
            assert_eq!(v[0], text);
        }
    }

    #[test]
    fn test_word_drop_removes_exactly_one_word() {
        let text = "one two three four five";
        for seed in 0..20 {
            let v = augmenter(seed).variants(text);
            let original: Vec<&str> = text.split_whitespace().collect();
            let dropped:  Vec<&str> = v[1].split_whitespace().collect();
            assert_eq!(dropped.len(), original.len() - 1);
            // remaining words keep their relative order
            let mut it = original.iter();
            assert!(dropped.iter().all(|w| it.any(|o| o == w)));
        }
    }

    #[test]
    fn test_swap_is_a_permutation() {
        let text = "alpha beta gamma delta epsilon zeta";
        for seed in 0..20 {
            let v = augmenter(seed).variants(text);
            assert_eq!(sorted_words(&v[2]), sorted_words(text));
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let text = "this is a somewhat longer sentence";
        assert_eq!(augmenter(7).variants(text), augmenter(7).variants(text));
    }

    #[test]
    fn test_labels_are_preserved() {
        let rec = NormalizedRecord {
            text:    "i do not want to be here".into(),
            emotion: "suicidal".into(),
        };
        let out = augmenter(3).augment(&rec);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].text, rec.text);
        assert!(out.iter().all(|r| r.emotion == "suicidal"));
    }

    #[test]
    fn test_apply_swaps_uses_snapshot_semantics() {
        let words = ["a", "b", "c", "d", "e"];
        // position 1 overlaps the swap at 0 and is skipped
        let out = apply_swaps(&words, &[true, true, false, true]);
        assert_eq!(out, vec!["b", "a", "c", "e", "d"]);
    }

    #[test]
    fn test_apply_swaps_chain_does_not_carry_a_word() {
        let words = ["a", "b", "c", "d"];
        let out   = apply_swaps(&words, &[true, true, true]);
        assert_eq!(out, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_apply_swaps_no_decisions() {
        let words = ["a", "b", "c", "d"];
        assert_eq!(apply_swaps(&words, &[false, false, false]), words.to_vec());
    }
}
