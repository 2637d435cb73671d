//! Gaussian model with a mean and a standard deviation per class (`sjk`).

use super::{empty_class_check, imported_values, ClassIndices, Mixture, ModelContext, ParamExport};
use crate::data::{parse_column, AugmentedData, Imputable, MisKind, MisVal};
use crate::rng::McRng;
use crate::stat::{ImputationStatistic, ImputedValue, RunningStatistic};
use mc_common::{Diagnostic, Diagnostics, MIN_MODALITY};
use mc_math::log_normal_pdf;
use rand::Rng;
use rand_distr::{Distribution, Normal as NormalSampler};
use statrs::distribution::{ContinuousCDF, Normal};

const ACCEPTED: &[MisKind] = &[
    MisKind::Present,
    MisKind::Missing,
    MisKind::Interval,
    MisKind::LowerUnbounded,
    MisKind::UpperUnbounded,
];

/// Below this probability mass a truncated draw falls back to a uniform one.
const MIN_TRUNCATED_MASS: f64 = 1e-12;
const MIN_SD: f64 = 1e-8;

pub struct GaussianMixture {
    id: String,
    nb_class: usize,
    augmented: AugmentedData<f64>,
    /// `param[2k]` is the mean, `param[2k + 1]` the standard deviation.
    param: Vec<f64>,
    param_stat: RunningStatistic,
    data_stat: ImputationStatistic<f64>,
}

impl GaussianMixture {
    pub const NAME: &'static str = "Gaussian";

    pub fn from_context(ctx: &ModelContext<'_>) -> Result<(Self, Diagnostics), Diagnostics> {
        let parsed = parse_column::<f64>(ctx.id, ctx.cells, 0.0, ACCEPTED)?;
        Ok((
            Self::new(ctx.id, ctx.nb_class, parsed.data, ctx.confidence_level),
            parsed.warnings,
        ))
    }

    pub fn new(id: &str, nb_class: usize, augmented: AugmentedData<f64>, confidence_level: f64) -> Self {
        let mut param = Vec::with_capacity(2 * nb_class);
        for _ in 0..nb_class {
            param.extend_from_slice(&[0.0, 1.0]);
        }
        Self {
            id: id.to_string(),
            nb_class,
            augmented,
            param,
            param_stat: RunningStatistic::new(confidence_level),
            data_stat: ImputationStatistic::new(confidence_level),
        }
    }

    pub fn mean(&self, k: usize) -> f64 {
        self.param[2 * k]
    }

    pub fn sd(&self, k: usize) -> f64 {
        self.param[2 * k + 1]
    }

    pub fn set_param(&mut self, k: usize, mean: f64, sd: f64) {
        self.param[2 * k] = mean;
        self.param[2 * k + 1] = sd;
    }

    pub fn data(&self) -> &AugmentedData<f64> {
        &self.augmented
    }

    fn cdf(&self, k: usize, x: f64) -> f64 {
        match Normal::new(self.mean(k), self.sd(k)) {
            Ok(n) => n.cdf(x),
            Err(_) => f64::NAN,
        }
    }

    /// Draw from class `k` restricted to `[lo, hi]` (either bound may be infinite).
    fn truncated_draw(&self, k: usize, lo: f64, hi: f64, rng: &mut McRng) -> f64 {
        let normal = match Normal::new(self.mean(k), self.sd(k)) {
            Ok(n) => n,
            Err(_) => return uniform_or_bound(lo, hi, rng),
        };
        let p_lo = if lo.is_finite() { normal.cdf(lo) } else { 0.0 };
        let p_hi = if hi.is_finite() { normal.cdf(hi) } else { 1.0 };
        let mass = p_hi - p_lo;
        if mass.is_nan() || mass <= MIN_TRUNCATED_MASS {
            return uniform_or_bound(lo, hi, rng);
        }
        let u = p_lo + rng.random::<f64>() * (p_hi - p_lo);
        let x = normal.inverse_cdf(u.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON));
        if x.is_finite() {
            x.clamp(lo, hi)
        } else {
            uniform_or_bound(lo, hi, rng)
        }
    }
}

/// Uniform draw on a finite interval, else the finite bound.
fn uniform_or_bound(lo: f64, hi: f64, rng: &mut McRng) -> f64 {
    match (lo.is_finite(), hi.is_finite()) {
        (true, true) => f64::uniform_between(lo, hi, rng),
        (true, _) => lo,
        (false, true) => hi,
        (false, false) => 0.0,
    }
}

/// Mean and standard deviation, computed on values divided by their largest
/// magnitude so that finite data near `f64::MAX` give finite moments.
fn scaled_moments(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let scale = values.clone().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return (0.0, 0.0);
    }
    if !scale.is_finite() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.clone().count() as f64;
    let mean = values.clone().map(|v| v / scale).sum::<f64>() / n;
    let var = values.map(|v| (v / scale - mean).powi(2)).sum::<f64>() / n;
    (mean * scale, var.sqrt() * scale)
}

/// True when the individuals take at least two distinct values.
fn has_two_values(values: impl Iterator<Item = f64>) -> bool {
    let mut first = None;
    for v in values {
        match first {
            None => first = Some(v),
            Some(f) if f != v => return true,
            Some(_) => {}
        }
    }
    false
}

impl Mixture for GaussianMixture {
    fn id_name(&self) -> &str {
        &self.id
    }

    fn model_name(&self) -> &'static str {
        Self::NAME
    }

    fn init_data(&mut self, rng: &mut McRng) {
        self.augmented.remove_missing(rng);
    }

    fn m_step(&mut self, class_ind: &ClassIndices) -> Diagnostics {
        let mut diags = empty_class_check(&self.id, class_ind);
        for (k, members) in class_ind.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let (mean, sd) = scaled_moments(members.iter().map(|&i| self.augmented.data[i]));
            if !sd.is_finite() || sd <= MIN_SD {
                diags.push(
                    Diagnostic::degeneracy(format!(
                        "null standard deviation in class {}",
                        k as i64 + MIN_MODALITY
                    ))
                    .for_variable(&self.id),
                );
                continue;
            }
            self.set_param(k, mean, sd);
        }
        diags
    }

    fn ln_completed_probability(&self, i: usize, k: usize) -> f64 {
        log_normal_pdf(self.augmented.data[i], self.mean(k), self.sd(k))
    }

    fn ln_observed_probability(&self, i: usize, k: usize) -> f64 {
        match &self.augmented.mis_data[i] {
            MisVal::Present => self.ln_completed_probability(i, k),
            MisVal::Interval(lo, hi) => (self.cdf(k, *hi) - self.cdf(k, *lo)).ln(),
            MisVal::LowerUnbounded(hi) => self.cdf(k, *hi).ln(),
            MisVal::UpperUnbounded(lo) => (1.0 - self.cdf(k, *lo)).ln(),
            MisVal::Missing | MisVal::FiniteValues(_) => 0.0,
        }
    }

    fn sampling_step(&mut self, i: usize, z_i: usize, rng: &mut McRng) {
        let value = match &self.augmented.mis_data[i] {
            MisVal::Present | MisVal::FiniteValues(_) => return,
            MisVal::Missing => match NormalSampler::new(self.mean(z_i), self.sd(z_i)) {
                Ok(n) => n.sample(rng),
                Err(_) => self.mean(z_i),
            },
            MisVal::Interval(lo, hi) => self.truncated_draw(z_i, *lo, *hi, rng),
            MisVal::LowerUnbounded(hi) => self.truncated_draw(z_i, f64::NEG_INFINITY, *hi, rng),
            MisVal::UpperUnbounded(lo) => self.truncated_draw(z_i, *lo, f64::INFINITY, rng),
        };
        if value.is_finite() {
            self.augmented.data[i] = value;
        }
    }

    fn check_sample_condition(&self, class_ind: &ClassIndices) -> Diagnostics {
        class_ind
            .iter()
            .enumerate()
            .filter(|(_, members)| !has_two_values(members.iter().map(|&i| self.augmented.data[i])))
            .map(|(k, _)| {
                Diagnostic::degeneracy(format!(
                    "class {} holds fewer than two distinct values",
                    k as i64 + MIN_MODALITY
                ))
                .for_variable(&self.id)
            })
            .collect()
    }

    fn nb_free_parameter(&self) -> usize {
        2 * self.nb_class
    }

    fn write_parameters(&self) -> String {
        (0..self.nb_class)
            .map(|k| {
                format!(
                    "\tclass {}: mean = {}, sd = {}\n",
                    k as i64 + MIN_MODALITY,
                    self.mean(k),
                    self.sd(k)
                )
            })
            .collect()
    }

    fn store_sem_run(&mut self, iteration: usize, iteration_max: usize) {
        if self.param_stat.sample(iteration, iteration_max, &self.param) {
            self.param = self.param_stat.means();
        }
    }

    fn store_gibbs_run(&mut self, i: usize, iteration: usize, iteration_max: usize) {
        if self.augmented.is_present(i) {
            return;
        }
        if let Some(v) = self.data_stat.sample(i, iteration, iteration_max, self.augmented.data[i]) {
            self.augmented.data[i] = v;
        }
    }

    fn export_param(&self) -> ParamExport {
        let names = (0..self.nb_class)
            .flat_map(|k| {
                let k = k as i64 + MIN_MODALITY;
                [format!("k: {}, mean", k), format!("k: {}, sd", k)]
            })
            .collect();
        ParamExport::from_stat(&self.id, names, &self.param_stat, &self.param)
    }

    fn import_param(&mut self, param: &ParamExport) -> Diagnostics {
        let values = match imported_values(&self.id, param, 2 * self.nb_class) {
            Ok(values) => values,
            Err(d) => return d,
        };
        let diags: Diagnostics = (0..self.nb_class)
            .filter(|k| values[2 * k + 1] <= 0.0)
            .map(|k| {
                Diagnostic::model_mismatch(format!(
                    "standard deviation of class {} must be positive",
                    k as i64 + MIN_MODALITY
                ))
                .for_variable(&self.id)
            })
            .collect();
        if diags.is_empty() {
            self.param = values;
        }
        diags
    }

    fn param_str(&self) -> String {
        String::new()
    }

    fn imputed(&self) -> Vec<ImputedValue> {
        self.data_stat.export(0.0)
    }

    fn completed_data(&self) -> Vec<f64> {
        self.augmented.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;

    #[test]
    fn m_step_estimates_mean_and_sd() {
        let data = AugmentedData::from_present(vec![1.0, 3.0, 10.0, 10.0, 14.0]);
        let mut model = GaussianMixture::new("x", 2, data, 0.95);
        let diags = model.m_step(&[vec![0, 1], vec![2, 3, 4]]);
        assert!(diags.is_empty());
        assert!((model.mean(0) - 2.0).abs() < 1e-12);
        assert!((model.sd(0) - 1.0).abs() < 1e-12);
        assert!((model.mean(1) - 34.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.nb_free_parameter(), 4);
    }

    #[test]
    fn constant_class_is_degenerate() {
        let data = AugmentedData::from_present(vec![2.0, 2.0, 1.0, 5.0]);
        let mut model = GaussianMixture::new("x", 2, data, 0.95);
        let class_ind = [vec![0, 1], vec![2, 3]];
        assert_eq!(model.check_sample_condition(&class_ind).len(), 1);
        let diags = model.m_step(&class_ind);
        assert_eq!(diags.len(), 1);
        assert!(diags.iter().next().unwrap().message.contains("class 1"));
    }

    #[test]
    fn interval_draws_stay_inside() {
        let mut data = AugmentedData::new();
        data.push(0.0, MisVal::Interval(4.0, 4.5));
        data.push(0.0, MisVal::UpperUnbounded(50.0));
        data.push(0.0, MisVal::LowerUnbounded(-1.0));
        data.compute_range();
        let mut model = GaussianMixture::new("x", 1, data, 0.95);
        model.set_param(0, 0.0, 1.0);
        let mut r = rng::master(Some(8));
        for _ in 0..500 {
            for i in 0..3 {
                model.sampling_step(i, 0, &mut r);
            }
            let d = &model.data().data;
            assert!((4.0..=4.5).contains(&d[0]));
            assert!(d[1] >= 50.0);
            assert!(d[2] <= -1.0);
        }
    }

    #[test]
    fn observed_probability_of_interval() {
        let mut data = AugmentedData::new();
        data.push(0.0, MisVal::Interval(-1.0, 1.0));
        data.push(0.0, MisVal::UpperUnbounded(0.0));
        let mut model = GaussianMixture::new("x", 1, data, 0.95);
        model.set_param(0, 0.0, 1.0);
        assert!((model.ln_observed_probability(0, 0) - 0.682_689_492f64.ln()).abs() < 1e-6);
        assert!((model.ln_observed_probability(1, 0) - 0.5f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn extreme_bounds_stay_finite() {
        let mut data = AugmentedData::new();
        data.push(0.0, MisVal::Interval(-1e308, 1e308));
        data.push(-1e308, MisVal::Present);
        data.push(1e308, MisVal::Present);
        data.push(0.0, MisVal::Missing);
        data.compute_range();
        let mut model = GaussianMixture::new("x", 1, data, 0.95);
        let mut r = rng::master(Some(21));
        for _ in 0..200 {
            model.init_data(&mut r);
            assert!(model.data().data.iter().all(|v| v.is_finite()));
            assert!((-1e308..=1e308).contains(&model.data().data[0]));
        }

        let diags = model.m_step(&[vec![0, 1, 2, 3]]);
        assert!(diags.is_empty());
        assert!(model.mean(0).is_finite());
        assert!(model.sd(0).is_finite() && model.sd(0) > 1e307);
        model.sampling_step(0, 0, &mut r);
        assert!((-1e308..=1e308).contains(&model.data().data[0]));
    }

    #[test]
    fn import_checks_standard_deviations() {
        let data = AugmentedData::from_present(vec![0.0, 1.0]);
        let mut source = GaussianMixture::new("x", 2, data.clone(), 0.95);
        source.set_param(0, -1.0, 0.5);
        source.set_param(1, 4.0, 2.0);
        let mut model = GaussianMixture::new("x", 2, data, 0.95);
        assert!(model.import_param(&source.export_param()).is_empty());
        assert_eq!((model.mean(1), model.sd(1)), (4.0, 2.0));

        source.set_param(1, 4.0, 0.0);
        assert_eq!(model.import_param(&source.export_param()).len(), 1);
        assert_eq!(model.sd(1), 2.0);
    }

    #[test]
    fn gibbs_store_imputes_mean() {
        let mut data = AugmentedData::new();
        data.push(1.0, MisVal::Present);
        data.push(0.0, MisVal::Missing);
        let mut model = GaussianMixture::new("x", 1, data, 0.95);
        for (it, v) in [1.0, 2.0, 3.0].iter().enumerate() {
            model.augmented.data[1] = *v;
            model.store_gibbs_run(1, it, 2);
        }
        assert_eq!(model.data().data[1], 2.0);
        model.store_gibbs_run(0, 0, 0);
        assert_eq!(model.data().data[0], 1.0);
    }
}
