//! Property-based tests for mc-math numerical functions.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use mc_math::{
    categorical_index, confidence_bounds, interpolated_order_statistic, log_add_exp,
    log_sum_exp, normalize_log_weights,
};
use proptest::prelude::*;

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-10;

/// Helper to check approximate equality.
fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() && b.is_infinite() {
        return a.signum() == b.signum();
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

// ============================================================================
// log_sum_exp properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// log_sum_exp is commutative: order doesn't matter.
    #[test]
    fn log_sum_exp_commutative(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        let ab = log_sum_exp(&[a, b]);
        let ba = log_sum_exp(&[b, a]);
        prop_assert!(approx_eq(ab, ba, TOL), "lse([{},{}])={} != {}", a, b, ab, ba);
    }

    /// log_sum_exp agrees with pairwise log_add_exp.
    #[test]
    fn log_sum_exp_matches_pairwise(a in -50.0..50.0f64, b in -50.0..50.0f64, c in -50.0..50.0f64) {
        let direct = log_sum_exp(&[a, b, c]);
        let folded = log_add_exp(log_add_exp(a, b), c);
        prop_assert!(approx_eq(direct, folded, TOL), "{} != {}", direct, folded);
    }

    /// No overflow with large log-weights.
    #[test]
    fn log_sum_exp_no_overflow(a in 500.0..700.0f64, b in 500.0..700.0f64) {
        let result = log_sum_exp(&[a, b]);
        prop_assert!(result.is_finite());
        prop_assert!(result >= a.max(b) - TOL);
    }
}

// ============================================================================
// Row normalisation properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// A normalised row is a probability distribution, however small the inputs.
    #[test]
    fn normalized_row_sums_to_one(row in prop::collection::vec(-5000.0..0.0f64, 1..12)) {
        let mut probs = row.clone();
        let norm = normalize_log_weights(&mut probs);
        let sum: f64 = probs.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9, "row sums to {}", sum);
        prop_assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        prop_assert!(approx_eq(norm, log_sum_exp(&row), 1e-9));
    }

    /// Normalisation is invariant to a constant shift of the log-weights.
    #[test]
    fn normalized_row_shift_invariant(row in prop::collection::vec(-50.0..50.0f64, 2..8), shift in -700.0..700.0f64) {
        let mut a = row.clone();
        let mut b: Vec<f64> = row.iter().map(|v| v + shift).collect();
        normalize_log_weights(&mut a);
        normalize_log_weights(&mut b);
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert!((x - y).abs() < 1e-9);
        }
    }
}

// ============================================================================
// Order statistics and discrete draws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Interval bounds bracket the draws and are ordered.
    #[test]
    fn bounds_are_ordered(samples in prop::collection::vec(-1e6..1e6f64, 1..200), level in 0.01..0.99f64) {
        let mut s = samples.clone();
        let b = confidence_bounds(&mut s, level).unwrap();
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(b.low <= b.high + TOL);
        prop_assert!(b.low >= min - TOL && b.high <= max + TOL);
        prop_assert!(b.mean >= min - 1e-6 && b.mean <= max + 1e-6);
    }

    /// Interpolated order statistics are monotone in the rank.
    #[test]
    fn order_statistic_monotone(mut samples in prop::collection::vec(-100.0..100.0f64, 2..50), r1 in 0.0..1.0f64, r2 in 0.0..1.0f64) {
        samples.sort_by(|a, b| a.total_cmp(b));
        let last = (samples.len() - 1) as f64;
        let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        let a = interpolated_order_statistic(&samples, lo * last);
        let b = interpolated_order_statistic(&samples, hi * last);
        prop_assert!(a <= b + TOL);
    }

    /// Draws never land on a zero-weight index.
    #[test]
    fn categorical_skips_zero_weights(weights in prop::collection::vec(prop_oneof![Just(0.0), 0.01..10.0f64], 1..10), u in 0.0..1.0f64) {
        match categorical_index(&weights, u) {
            Some(idx) => prop_assert!(weights[idx] > 0.0),
            None => prop_assert!(weights.iter().all(|w| *w == 0.0)),
        }
    }
}
