//! Poisson model with one rate per class (`k`).

use super::{empty_class_check, imported_values, ClassIndices, Mixture, ModelContext, ParamExport};
use crate::data::{parse_column, AugmentedData, MisKind, MisVal};
use crate::rng::McRng;
use crate::stat::{ImputationStatistic, ImputedValue, RunningStatistic};
use mc_common::{Diagnostic, Diagnostics, MIN_MODALITY};
use mc_math::{categorical_index, log_poisson_pmf, log_sum_exp, normalize_log_weights};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Largest number of values enumerated for a bounded cell; the mass beyond is
/// treated as zero.
const MAX_ENUMERATED: i64 = 10_000;

const ACCEPTED: &[MisKind] = &[
    MisKind::Present,
    MisKind::Missing,
    MisKind::FiniteValues,
    MisKind::Interval,
    MisKind::LowerUnbounded,
];

pub struct PoissonMixture {
    id: String,
    nb_class: usize,
    augmented: AugmentedData<i64>,
    lambda: Vec<f64>,
    param_stat: RunningStatistic,
    data_stat: ImputationStatistic<i64>,
}

impl PoissonMixture {
    pub const NAME: &'static str = "Poisson";

    pub fn from_context(ctx: &ModelContext<'_>) -> Result<(Self, Diagnostics), Diagnostics> {
        let parsed = parse_column::<i64>(ctx.id, ctx.cells, 0, ACCEPTED)?;
        if let Some(min) = parsed.data.min_value() {
            if min < 0 {
                return Err(Diagnostic::model_mismatch(format!(
                    "counts must be non-negative, found {}",
                    min
                ))
                .for_variable(ctx.id)
                .into());
            }
        }
        Ok((
            Self::new(ctx.id, ctx.nb_class, parsed.data, ctx.confidence_level),
            parsed.warnings,
        ))
    }

    pub fn new(id: &str, nb_class: usize, mut augmented: AugmentedData<i64>, confidence_level: f64) -> Self {
        // one-sided cells are bounded below by zero
        if let Some(r) = augmented.range() {
            augmented.pin_range(0, r.max.max(0));
        }
        Self {
            id: id.to_string(),
            nb_class,
            augmented,
            lambda: vec![1.0; nb_class],
            param_stat: RunningStatistic::new(confidence_level),
            data_stat: ImputationStatistic::new(confidence_level),
        }
    }

    pub fn lambda(&self, k: usize) -> f64 {
        self.lambda[k]
    }

    pub fn set_lambda(&mut self, k: usize, lambda: f64) {
        self.lambda[k] = lambda;
    }

    pub fn data(&self) -> &AugmentedData<i64> {
        &self.augmented
    }

    /// Admissible values of a bounded cell.
    fn candidates(mis: &MisVal<i64>) -> Option<Vec<i64>> {
        match mis {
            MisVal::FiniteValues(values) => Some(values.clone()),
            MisVal::Interval(lo, hi) => {
                let lo = (*lo).max(0);
                Some((lo..=(*hi).min(lo.saturating_add(MAX_ENUMERATED))).collect())
            }
            MisVal::LowerUnbounded(hi) => Some((0..=(*hi).min(MAX_ENUMERATED)).collect()),
            _ => None,
        }
    }

    fn ln_pmf(&self, x: i64, k: usize) -> f64 {
        if x < 0 {
            return f64::NEG_INFINITY;
        }
        log_poisson_pmf(x as u64, self.lambda[k])
    }
}

impl Mixture for PoissonMixture {
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
            let sum: f64 = members.iter().map(|&i| self.augmented.data[i] as f64).sum();
            if sum == 0.0 {
                diags.push(
                    Diagnostic::degeneracy(format!(
                        "class {} only contains zeros",
                        k as i64 + MIN_MODALITY
                    ))
                    .for_variable(&self.id),
                );
                continue;
            }
            self.lambda[k] = sum / members.len() as f64;
        }
        diags
    }

    fn ln_completed_probability(&self, i: usize, k: usize) -> f64 {
        self.ln_pmf(self.augmented.data[i], k)
    }

    fn ln_observed_probability(&self, i: usize, k: usize) -> f64 {
        let mis = &self.augmented.mis_data[i];
        match Self::candidates(mis) {
            Some(values) => {
                let terms: Vec<f64> = values.iter().map(|x| self.ln_pmf(*x, k)).collect();
                log_sum_exp(&terms)
            }
            None if mis.is_present() => self.ln_completed_probability(i, k),
            None => 0.0,
        }
    }

    fn sampling_step(&mut self, i: usize, z_i: usize, rng: &mut McRng) {
        let mis = &self.augmented.mis_data[i];
        let value = match Self::candidates(mis) {
            Some(values) => {
                let mut weights: Vec<f64> = values.iter().map(|x| self.ln_pmf(*x, z_i)).collect();
                normalize_log_weights(&mut weights);
                match categorical_index(&weights, rng.random::<f64>()) {
                    Some(idx) => values[idx],
                    None => return,
                }
            }
            None if mis.is_present() => return,
            None => match Poisson::new(self.lambda[z_i]) {
                Ok(p) => p.sample(rng) as i64,
                Err(_) => 0,
            },
        };
        self.augmented.data[i] = value;
    }

    fn check_sample_condition(&self, class_ind: &ClassIndices) -> Diagnostics {
        class_ind
            .iter()
            .enumerate()
            .filter(|(_, members)| members.iter().all(|&i| self.augmented.data[i] == 0))
            .map(|(k, _)| {
                Diagnostic::degeneracy(format!(
                    "class {} only contains zeros",
                    k as i64 + MIN_MODALITY
                ))
                .for_variable(&self.id)
            })
            .collect()
    }

    fn nb_free_parameter(&self) -> usize {
        self.nb_class
    }

    fn write_parameters(&self) -> String {
        self.lambda
            .iter()
            .enumerate()
            .map(|(k, l)| format!("\tclass {}: lambda = {}\n", k as i64 + MIN_MODALITY, l))
            .collect()
    }

    fn store_sem_run(&mut self, iteration: usize, iteration_max: usize) {
        if self.param_stat.sample(iteration, iteration_max, &self.lambda) {
            self.lambda = self.param_stat.means();
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
            .map(|k| format!("k: {}, lambda", k as i64 + MIN_MODALITY))
            .collect();
        ParamExport::from_stat(&self.id, names, &self.param_stat, &self.lambda)
    }

    fn import_param(&mut self, param: &ParamExport) -> Diagnostics {
        let values = match imported_values(&self.id, param, self.nb_class) {
            Ok(values) => values,
            Err(d) => return d,
        };
        if let Some(k) = values.iter().position(|l| *l <= 0.0) {
            return Diagnostic::model_mismatch(format!(
                "lambda of class {} must be positive",
                k as i64 + MIN_MODALITY
            ))
            .for_variable(&self.id)
            .into();
        }
        self.lambda = values;
        Diagnostics::new()
    }

    fn param_str(&self) -> String {
        String::new()
    }

    fn imputed(&self) -> Vec<ImputedValue> {
        self.data_stat.export(0.0)
    }

    fn completed_data(&self) -> Vec<f64> {
        self.augmented.data.iter().map(|v| *v as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;
    use mc_common::RunMode;

    #[test]
    fn negative_counts_rejected() {
        let cells: Vec<String> = ["2", "-1"].iter().map(|s| s.to_string()).collect();
        let ctx = ModelContext {
            id: "n",
            cells: &cells,
            param_str: None,
            nb_class: 2,
            mode: RunMode::Learning,
            confidence_level: 0.95,
            strict_modalities: false,
        };
        assert!(PoissonMixture::from_context(&ctx).is_err());
    }

    #[test]
    fn m_step_and_zero_class() {
        let data = AugmentedData::from_present(vec![0, 0, 2, 4]);
        let mut model = PoissonMixture::new("n", 2, data, 0.95);
        let class_ind = [vec![0, 1], vec![2, 3]];
        assert_eq!(model.check_sample_condition(&class_ind).len(), 1);
        let diags = model.m_step(&class_ind);
        assert_eq!(diags.len(), 1);
        assert_eq!(model.lambda(1), 3.0);
        assert_eq!(model.nb_free_parameter(), 2);
    }

    #[test]
    fn bounded_draws_respect_constraint() {
        let mut data = AugmentedData::new();
        data.push(5, MisVal::Present);
        data.push(0, MisVal::Interval(2, 4));
        data.push(0, MisVal::LowerUnbounded(1));
        data.push(0, MisVal::FiniteValues(vec![0, 7]));
        data.compute_range();
        let mut model = PoissonMixture::new("n", 1, data, 0.95);
        model.set_lambda(0, 3.0);
        let mut r = rng::master(Some(13));
        for _ in 0..300 {
            for i in 0..4 {
                model.sampling_step(i, 0, &mut r);
            }
            let d = &model.data().data;
            assert_eq!(d[0], 5);
            assert!((2..=4).contains(&d[1]));
            assert!((0..=1).contains(&d[2]));
            assert!(d[3] == 0 || d[3] == 7);
        }
    }

    #[test]
    fn import_requires_positive_rates() {
        let data = AugmentedData::from_present(vec![1, 2]);
        let mut source = PoissonMixture::new("n", 2, data.clone(), 0.95);
        source.set_lambda(0, 0.5);
        source.set_lambda(1, 7.0);
        let mut model = PoissonMixture::new("n", 2, data, 0.95);
        assert!(model.import_param(&source.export_param()).is_empty());
        assert_eq!(model.lambda(1), 7.0);

        source.set_lambda(0, 0.0);
        assert!(model.import_param(&source.export_param()).to_string().contains("class 1"));
    }

    #[test]
    fn observed_probability_marginalises_interval() {
        let mut data = AugmentedData::new();
        data.push(0, MisVal::Interval(0, 1));
        let mut model = PoissonMixture::new("n", 1, data, 0.95);
        model.set_lambda(0, 2.0);
        // P(X <= 1) = 3 e^-2
        let expected = 3.0f64.ln() - 2.0;
        assert!((model.ln_observed_probability(0, 0) - expected).abs() < 1e-10);
    }
}
