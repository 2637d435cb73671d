//! Inverse-CDF draws from discrete distributions.
//!
//! These helpers take the uniform variate as input so that the caller owns
//! the random stream.

/// Index drawn from unnormalised non-negative `weights` given `u` in `[0, 1)`.
///
/// Returns `None` when the weights are empty, contain a negative or NaN
/// entry, or sum to zero.
pub fn categorical_index(weights: &[f64], u: f64) -> Option<usize> {
    if weights.iter().any(|w| w.is_nan() || *w < 0.0) {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let target = u.clamp(0.0, 1.0) * total;
    let mut acc = 0.0;
    let mut last_positive = None;
    for (idx, w) in weights.iter().enumerate() {
        if *w == 0.0 {
            continue;
        }
        acc += w;
        last_positive = Some(idx);
        if target < acc {
            return Some(idx);
        }
    }
    // Rounding can leave target == total.
    last_positive
}

/// Index of the largest entry; ties go to the first.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| *v > b) {
            best = Some((idx, *v));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_follow_cumulative_weights() {
        let w = [0.2, 0.0, 0.8];
        assert_eq!(categorical_index(&w, 0.0), Some(0));
        assert_eq!(categorical_index(&w, 0.19), Some(0));
        assert_eq!(categorical_index(&w, 0.2), Some(2));
        assert_eq!(categorical_index(&w, 0.999_999), Some(2));
        assert_eq!(categorical_index(&w, 1.0), Some(2));
    }

    #[test]
    fn unnormalised_weights() {
        assert_eq!(categorical_index(&[1.0, 3.0], 0.3), Some(1));
    }

    #[test]
    fn invalid_weights() {
        assert_eq!(categorical_index(&[], 0.5), None);
        assert_eq!(categorical_index(&[0.0, 0.0], 0.5), None);
        assert_eq!(categorical_index(&[1.0, -1.0], 0.5), None);
        assert_eq!(categorical_index(&[f64::NAN], 0.5), None);
    }

    #[test]
    fn argmax_first_on_tie() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
