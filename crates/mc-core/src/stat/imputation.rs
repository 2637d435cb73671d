//! Per-individual statistics of imputed values during the Gibbs run.

use crate::data::Imputable;
use mc_math::{confidence_bounds, finite_mean, mode_of};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point estimate of a set of draws.
pub trait PointEstimate: Imputable {
    fn point_estimate(draws: &[Self]) -> Option<Self>;
}

impl PointEstimate for f64 {
    fn point_estimate(draws: &[Self]) -> Option<Self> {
        if draws.is_empty() {
            return None;
        }
        Some(finite_mean(draws))
    }
}

impl PointEstimate for i64 {
    fn point_estimate(draws: &[Self]) -> Option<Self> {
        mode_of(draws)
    }
}

/// Final imputation of one individual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImputedValue {
    pub individual: usize,
    pub value: f64,
    pub low: f64,
    pub high: f64,
}

/// Collects the draws of the individual currently being sampled.
///
/// Gibbs chains run one individual at a time, so a single buffer is reused;
/// each finished chain leaves an [`ImputedValue`] behind.
#[derive(Debug, Clone)]
pub struct ImputationStatistic<T> {
    confidence_level: f64,
    draws: Vec<T>,
    imputed: BTreeMap<usize, ImputedValue>,
}

impl<T: PointEstimate> ImputationStatistic<T> {
    pub fn new(confidence_level: f64) -> Self {
        Self {
            confidence_level,
            draws: Vec::new(),
            imputed: BTreeMap::new(),
        }
    }

    /// Record the draw of `iteration` for individual `i`.
    ///
    /// Returns the point estimate at `iteration_max`, to be imputed.
    pub fn sample(&mut self, i: usize, iteration: usize, iteration_max: usize, value: T) -> Option<T> {
        if iteration == 0 {
            self.draws.clear();
        }
        self.draws.push(value);
        if iteration != iteration_max {
            return None;
        }
        let estimate = T::point_estimate(&self.draws)?;
        let mut as_f64: Vec<f64> = self.draws.iter().map(|v| v.to_f64()).collect();
        let (low, high) = confidence_bounds(&mut as_f64, self.confidence_level)
            .map(|b| (b.low, b.high))
            .unwrap_or((estimate.to_f64(), estimate.to_f64()));
        self.imputed.insert(
            i,
            ImputedValue {
                individual: i,
                value: estimate.to_f64(),
                low,
                high,
            },
        );
        Some(estimate)
    }

    pub fn imputed(&self, i: usize) -> Option<&ImputedValue> {
        self.imputed.get(&i)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &ImputedValue)> {
        self.imputed.iter()
    }

    /// Every imputation in individual order, values shifted by `offset` into
    /// the external encoding.
    pub fn export(&self, offset: f64) -> Vec<ImputedValue> {
        self.imputed
            .values()
            .map(|v| ImputedValue {
                value: v.value + offset,
                low: v.low + offset,
                high: v.high + offset,
                ..*v
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_uses_mean() {
        let mut stat = ImputationStatistic::<f64>::new(0.5);
        assert_eq!(stat.sample(4, 0, 2, 1.0), None);
        assert_eq!(stat.sample(4, 1, 2, 2.0), None);
        assert_eq!(stat.sample(4, 2, 2, 6.0), Some(3.0));
        let v = stat.imputed(4).unwrap();
        assert_eq!(v.value, 3.0);
        assert!(v.low <= v.high);
    }

    #[test]
    fn discrete_uses_mode() {
        let mut stat = ImputationStatistic::<i64>::new(0.95);
        let draws = [2, 0, 2, 1, 2];
        let mut out = None;
        for (it, d) in draws.iter().enumerate() {
            out = stat.sample(0, it, draws.len() - 1, *d);
        }
        assert_eq!(out, Some(2));
        assert_eq!(stat.iter().count(), 1);
    }

    #[test]
    fn buffer_resets_per_individual() {
        let mut stat = ImputationStatistic::<i64>::new(0.95);
        stat.sample(0, 0, 1, 5);
        stat.sample(0, 1, 1, 5);
        stat.sample(1, 0, 1, 1);
        assert_eq!(stat.sample(1, 1, 1, 1), Some(1));
        assert_eq!(stat.imputed(0).unwrap().value, 5.0);
        assert_eq!(stat.imputed(1).unwrap().value, 1.0);

        let exported = stat.export(1.0);
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[1].individual, 1);
        assert_eq!((exported[1].value, exported[1].low, exported[1].high), (2.0, 2.0, 2.0));
    }
}
