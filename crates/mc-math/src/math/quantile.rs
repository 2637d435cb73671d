//! Order statistics for running confidence intervals.
//!
//! A long run produces `iteration_max + 1` draws of a parameter. The point
//! estimate is their mean and the two-sided interval at confidence level `c`
//! uses the draws at fractional ranks `alpha * iteration_max` and
//! `(1 - alpha) * iteration_max` with `alpha = (1 - c) / 2`, linearly
//! interpolated between the neighbouring order statistics.

use serde::{Deserialize, Serialize};

/// Mean and two-sided interval of a sampled parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBounds {
    pub mean: f64,
    pub low: f64,
    pub high: f64,
}

/// Value at a fractional rank of an ascending slice.
///
/// `rank` is clamped to `[0, len - 1]`. Returns NaN for an empty slice.
pub fn interpolated_order_statistic(sorted: &[f64], rank: f64) -> f64 {
    if sorted.is_empty() || rank.is_nan() {
        return f64::NAN;
    }
    let last = sorted.len() - 1;
    let rank = rank.clamp(0.0, last as f64);
    let floor = rank.floor() as usize;
    let frac = rank - floor as f64;
    if floor >= last {
        return sorted[last];
    }
    (1.0 - frac) * sorted[floor] + frac * sorted[floor + 1]
}

/// Arithmetic mean; terms are divided first when the plain sum overflows.
///
/// Returns NaN for an empty slice.
pub fn finite_mean(samples: &[f64]) -> f64 {
    let n = samples.len() as f64;
    let sum: f64 = samples.iter().sum();
    if sum.is_finite() {
        sum / n
    } else {
        samples.iter().map(|v| v / n).sum()
    }
}

/// Mean and interpolated quantiles of `samples` at `confidence_level`.
///
/// The slice is sorted in place. Returns `None` for an empty slice or a
/// confidence level outside `(0, 1)`.
pub fn confidence_bounds(samples: &mut [f64], confidence_level: f64) -> Option<ConfidenceBounds> {
    if samples.is_empty() || !(confidence_level > 0.0 && confidence_level < 1.0) {
        return None;
    }
    let mean = finite_mean(samples);
    samples.sort_by(|a, b| a.total_cmp(b));

    let iteration_max = (samples.len() - 1) as f64;
    let alpha = (1.0 - confidence_level) / 2.0;
    Some(ConfidenceBounds {
        mean,
        low: interpolated_order_statistic(samples, alpha * iteration_max),
        high: interpolated_order_statistic(samples, (1.0 - alpha) * iteration_max),
    })
}

/// Most frequent value of a discrete sample; ties go to the smallest value.
pub fn mode_of(samples: &[i64]) -> Option<i64> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let mut best: Option<(i64, usize)> = None;
    let mut idx = 0;
    while idx < sorted.len() {
        let value = sorted[idx];
        let run = sorted[idx..].iter().take_while(|v| **v == value).count();
        if best.map_or(true, |(_, n)| run > n) {
            best = Some((value, run));
        }
        idx += run;
    }
    best.map(|(v, _)| v)
}
