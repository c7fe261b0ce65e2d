//! Tier-2 Scorer: combine Tier-1, structural match count, and
//! modernity into the final rank.

use crate::config::Tier2Weights;
use crate::model::{clamp01, round2};

/// `tier2 = clamp01(tier1 + w_structural * min(match_count,3)/3 +
/// w_modernity * modernity_score)`. Deterministic; ties break on
/// `tier1_score` descending at the call site.
pub fn tier2_score(tier1_score: f64, structural_match_count: usize, modernity_score: f64, weights: &Tier2Weights) -> f64 {
    let structural_norm = structural_match_count.min(3) as f64 / 3.0;
    let score = tier1_score + weights.w_structural * structural_norm + weights.w_modernity * modernity_score;
    round2(clamp01(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_in_0_1() {
        let weights = Tier2Weights::default();
        for t1 in [0.0, 0.5, 1.0] {
            for count in [0, 1, 3, 10] {
                for m in [0.0, 0.5, 1.0] {
                    let s = tier2_score(t1, count, m, &weights);
                    assert!((0.0..=1.0).contains(&s));
                }
            }
        }
    }

    #[test]
    fn deterministic() {
        let weights = Tier2Weights::default();
        let a = tier2_score(0.5, 2, 0.75, &weights);
        let b = tier2_score(0.5, 2, 0.75, &weights);
        assert_eq!(a, b);
    }

    #[test]
    fn more_structural_matches_never_decreases_score() {
        let weights = Tier2Weights::default();
        let low = tier2_score(0.3, 1, 0.5, &weights);
        let high = tier2_score(0.3, 3, 0.5, &weights);
        assert!(high >= low);
    }

    proptest::proptest! {
        /// Bounds and determinism hold for any plausible input combination,
        /// not just the handful of fixed cases above.
        #[test]
        fn bounded_and_deterministic(
            tier1 in 0.0f64..1.0f64,
            count in 0usize..20usize,
            modernity in 0.0f64..1.0f64,
        ) {
            let weights = Tier2Weights::default();
            let a = tier2_score(tier1, count, modernity, &weights);
            let b = tier2_score(tier1, count, modernity, &weights);
            prop_assert!((0.0..=1.0).contains(&a));
            prop_assert_eq!(a, b);
        }
    }
}
