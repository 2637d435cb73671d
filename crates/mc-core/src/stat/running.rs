//! Running statistics of sampled parameters.

use mc_math::confidence_bounds;
use ndarray::{Array2, Axis};

/// Accumulates one parameter vector per iteration of a long run and turns
/// the draws into a point estimate with a two-sided interval.
///
/// The log matrix is `nb_param × (iteration_max + 1)`; it is allocated at
/// iteration 0 and summarised into the `nb_param × 3` export matrix
/// (mean, low, high) at `iteration_max`.
#[derive(Debug, Clone)]
pub struct RunningStatistic {
    confidence_level: f64,
    log: Array2<f64>,
    export: Array2<f64>,
    finalized: bool,
}

impl RunningStatistic {
    pub fn new(confidence_level: f64) -> Self {
        Self {
            confidence_level,
            log: Array2::zeros((0, 0)),
            export: Array2::zeros((0, 3)),
            finalized: false,
        }
    }

    /// Record `param` as the draw of `iteration`.
    ///
    /// Iteration 0 resets the statistic. Returns `true` when this call
    /// finalised the run.
    pub fn sample(&mut self, iteration: usize, iteration_max: usize, param: &[f64]) -> bool {
        if iteration == 0 {
            self.log = Array2::zeros((param.len(), iteration_max + 1));
            self.export = Array2::zeros((param.len(), 3));
            self.finalized = false;
        }
        if iteration >= self.log.ncols() || param.len() != self.log.nrows() {
            return false;
        }
        for (p, value) in param.iter().enumerate() {
            self.log[[p, iteration]] = *value;
        }
        if iteration == iteration_max {
            self.finalize();
            return true;
        }
        false
    }

    fn finalize(&mut self) {
        for (p, row) in self.log.axis_iter(Axis(0)).enumerate() {
            let mut draws = row.to_vec();
            if let Some(bounds) = confidence_bounds(&mut draws, self.confidence_level) {
                self.export[[p, 0]] = bounds.mean;
                self.export[[p, 1]] = bounds.low;
                self.export[[p, 2]] = bounds.high;
            }
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// `nb_param × 3` matrix of (mean, low, high).
    pub fn export(&self) -> &Array2<f64> {
        &self.export
    }

    /// Column of means.
    pub fn means(&self) -> Vec<f64> {
        self.export.column(0).to_vec()
    }

    /// Export rows as `[mean, low, high]` triples.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.export.outer_iter().map(|r| r.to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_on_known_sequence() {
        let mut stat = RunningStatistic::new(0.90);
        let iteration_max = 999;
        for it in 0..=iteration_max {
            let done = stat.sample(it, iteration_max, &[it as f64, 1.0]);
            assert_eq!(done, it == iteration_max);
        }
        let e = stat.export();
        assert!((e[[0, 0]] - 499.5).abs() < 1e-9);
        assert!((e[[0, 1]] - 49.95).abs() < 1e-9);
        assert!((e[[0, 2]] - 949.05).abs() < 1e-9);
        assert_eq!(stat.rows()[1], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn restart_resets() {
        let mut stat = RunningStatistic::new(0.95);
        stat.sample(0, 1, &[1.0]);
        stat.sample(1, 1, &[3.0]);
        assert_eq!(stat.means(), vec![2.0]);
        stat.sample(0, 2, &[10.0, 20.0]);
        assert!(!stat.is_finalized());
        stat.sample(1, 2, &[10.0, 20.0]);
        stat.sample(2, 2, &[10.0, 20.0]);
        assert_eq!(stat.means(), vec![10.0, 20.0]);
    }

    #[test]
    fn ignores_out_of_shape_draws() {
        let mut stat = RunningStatistic::new(0.95);
        stat.sample(0, 2, &[1.0]);
        assert!(!stat.sample(1, 2, &[1.0, 2.0]));
        assert!(!stat.sample(5, 2, &[1.0]));
    }
}
