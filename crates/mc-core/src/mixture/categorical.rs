//! Categorical model with one probability vector per class (`pjk`).

use super::{empty_class_check, imported_values, param_value, ClassIndices, Mixture, ModelContext, ParamExport};
use crate::data::{parse_column, AugmentedData, MisKind, MisVal};
use crate::rng::McRng;
use crate::stat::{ImputationStatistic, ImputedValue, RunningStatistic};
use mc_common::{Diagnostic, Diagnostics, RunMode, MIN_MODALITY};
use mc_math::categorical_index;
use rand::Rng;

const ACCEPTED: &[MisKind] = &[MisKind::Present, MisKind::Missing, MisKind::FiniteValues];

const MAX_MODALITY: usize = 10_000;

pub struct CategoricalMixture {
    id: String,
    nb_class: usize,
    nb_modality: usize,
    augmented: AugmentedData<i64>,
    /// `prob[k * nb_modality + m]`.
    prob: Vec<f64>,
    /// Treat a modality absent from a class as degenerate.
    strict_modalities: bool,
    param_stat: RunningStatistic,
    data_stat: ImputationStatistic<i64>,
}

impl CategoricalMixture {
    pub const NAME: &'static str = "Categorical";

    /// Parse the column, settle the number of modalities and pin the range.
    ///
    /// Returns the model with the per-cell warnings, or every diagnostic that
    /// makes the variable unusable.
    pub fn from_context(ctx: &ModelContext<'_>) -> Result<(Self, Diagnostics), Diagnostics> {
        let parsed = parse_column::<i64>(ctx.id, ctx.cells, MIN_MODALITY, ACCEPTED)?;
        let nb_modality = Self::nb_modality(ctx, &parsed.data)?;
        let model = Self::new(ctx.id, ctx.nb_class, nb_modality, parsed.data, ctx.confidence_level)
            .with_strict_modalities(ctx.strict_modalities);
        Ok((model, parsed.warnings))
    }

    fn nb_modality(ctx: &ModelContext<'_>, data: &AugmentedData<i64>) -> Result<usize, Diagnostics> {
        let mismatch = |msg: String| Diagnostics::from(Diagnostic::model_mismatch(msg).for_variable(ctx.id));

        if let Some(min) = data.min_value() {
            if min < 0 {
                return Err(mismatch(format!(
                    "modality {} is below the minimum modality {}",
                    min + MIN_MODALITY,
                    MIN_MODALITY
                )));
            }
        }
        let data_max = data.max_value().unwrap_or(0);
        if data_max >= MAX_MODALITY as i64 {
            return Err(mismatch(format!(
                "modality {} exceeds the supported maximum of {}",
                data_max + MIN_MODALITY,
                MAX_MODALITY
            )));
        }

        let declared = match ctx.param_str.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => {
                let raw = param_value(s, "nModality")
                    .ok_or_else(|| mismatch(format!("parameter string {:?} has no nModality", s)))?;
                let n = raw
                    .parse::<usize>()
                    .map_err(|_| mismatch(format!("nModality {:?} is not a positive integer", raw)))?;
                Some(n)
            }
            None => None,
        };

        match (declared, ctx.mode) {
            (Some(n), _) => {
                if n > MAX_MODALITY {
                    return Err(mismatch(format!(
                        "nModality: {} exceeds the supported maximum of {}",
                        n, MAX_MODALITY
                    )));
                }
                if n == 0 || (n as i64) <= data_max {
                    return Err(mismatch(format!(
                        "nModality: {} but modality {} is observed",
                        n,
                        data_max + MIN_MODALITY
                    )));
                }
                Ok(n)
            }
            (None, RunMode::Learning) => Ok((data_max + 1) as usize),
            (None, RunMode::Prediction) => Err(mismatch(
                "prediction requires the nModality parameter string".to_string(),
            )),
        }
    }

    pub fn new(
        id: &str,
        nb_class: usize,
        nb_modality: usize,
        mut augmented: AugmentedData<i64>,
        confidence_level: f64,
    ) -> Self {
        augmented.pin_range(0, nb_modality as i64 - 1);
        Self {
            id: id.to_string(),
            nb_class,
            nb_modality,
            augmented,
            prob: vec![1.0 / nb_modality as f64; nb_class * nb_modality],
            strict_modalities: false,
            param_stat: RunningStatistic::new(confidence_level),
            data_stat: ImputationStatistic::new(confidence_level),
        }
    }

    /// The likelihood stays bounded when a modality has zero probability in
    /// a class, so this check is off unless requested.
    pub fn with_strict_modalities(mut self, strict: bool) -> Self {
        self.strict_modalities = strict;
        self
    }

    pub fn modality_count(&self) -> usize {
        self.nb_modality
    }

    /// Probabilities of class `k`.
    pub fn class_prob(&self, k: usize) -> &[f64] {
        &self.prob[k * self.nb_modality..(k + 1) * self.nb_modality]
    }

    /// Install parameters, e.g. for prediction.
    pub fn set_prob(&mut self, prob: Vec<f64>) -> Diagnostics {
        if prob.len() != self.prob.len() {
            return Diagnostic::model_mismatch(format!(
                "expected {} probabilities, got {}",
                self.prob.len(),
                prob.len()
            ))
            .for_variable(&self.id)
            .into();
        }
        self.prob = prob;
        Diagnostics::new()
    }

    pub fn data(&self) -> &AugmentedData<i64> {
        &self.augmented
    }

    fn p(&self, k: usize, m: i64) -> f64 {
        if m < 0 || m as usize >= self.nb_modality {
            return 0.0;
        }
        self.prob[k * self.nb_modality + m as usize]
    }
}

impl Mixture for CategoricalMixture {
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
        let diags = empty_class_check(&self.id, class_ind);
        for (k, members) in class_ind.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let row = &mut self.prob[k * self.nb_modality..(k + 1) * self.nb_modality];
            row.iter_mut().for_each(|p| *p = 0.0);
            for &i in members {
                let m = self.augmented.data[i];
                if m >= 0 && (m as usize) < self.nb_modality {
                    row[m as usize] += 1.0;
                }
            }
            let n = members.len() as f64;
            row.iter_mut().for_each(|p| *p /= n);
        }
        diags
    }

    fn ln_completed_probability(&self, i: usize, k: usize) -> f64 {
        self.p(k, self.augmented.data[i]).ln()
    }

    fn ln_observed_probability(&self, i: usize, k: usize) -> f64 {
        match &self.augmented.mis_data[i] {
            MisVal::Present => self.p(k, self.augmented.data[i]).ln(),
            MisVal::FiniteValues(values) => values.iter().map(|m| self.p(k, *m)).sum::<f64>().ln(),
            _ => 0.0,
        }
    }

    fn sampling_step(&mut self, i: usize, z_i: usize, rng: &mut McRng) {
        let weights: Vec<f64> = match &self.augmented.mis_data[i] {
            MisVal::Present => return,
            MisVal::FiniteValues(values) => (0..self.nb_modality as i64)
                .map(|m| if values.contains(&m) { self.p(z_i, m) } else { 0.0 })
                .collect(),
            _ => self.class_prob(z_i).to_vec(),
        };
        match categorical_index(&weights, rng.random::<f64>()) {
            Some(m) => self.augmented.data[i] = m as i64,
            None => self.augmented.remove_missing_individual(i, rng),
        }
    }

    fn check_sample_condition(&self, class_ind: &ClassIndices) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if !self.strict_modalities {
            return diags;
        }
        for (k, members) in class_ind.iter().enumerate() {
            let mut seen = vec![false; self.nb_modality];
            for &i in members {
                let m = self.augmented.data[i];
                if m >= 0 && (m as usize) < self.nb_modality {
                    seen[m as usize] = true;
                }
            }
            for (m, _) in seen.iter().enumerate().filter(|(_, s)| !**s) {
                diags.push(
                    Diagnostic::degeneracy(format!(
                        "modality {} is absent from class {}",
                        m as i64 + MIN_MODALITY,
                        k as i64 + MIN_MODALITY
                    ))
                    .for_variable(&self.id),
                );
            }
        }
        diags
    }

    fn nb_free_parameter(&self) -> usize {
        self.nb_class * self.nb_modality.saturating_sub(1)
    }

    fn write_parameters(&self) -> String {
        let mut out = String::new();
        for k in 0..self.nb_class {
            out.push_str(&format!("\tclass {}: {:?}\n", k as i64 + MIN_MODALITY, self.class_prob(k)));
        }
        out
    }

    fn store_sem_run(&mut self, iteration: usize, iteration_max: usize) {
        if self.param_stat.sample(iteration, iteration_max, &self.prob) {
            self.prob = self.param_stat.means();
        }
    }

    fn store_gibbs_run(&mut self, i: usize, iteration: usize, iteration_max: usize) {
        if self.augmented.is_present(i) {
            return;
        }
        if let Some(m) = self.data_stat.sample(i, iteration, iteration_max, self.augmented.data[i]) {
            self.augmented.data[i] = m;
        }
    }

    fn export_param(&self) -> ParamExport {
        let names = (0..self.nb_class)
            .flat_map(|k| {
                (0..self.nb_modality).map(move |m| {
                    format!(
                        "k: {}, modality: {}",
                        k as i64 + MIN_MODALITY,
                        m as i64 + MIN_MODALITY
                    )
                })
            })
            .collect();
        ParamExport::from_stat(&self.id, names, &self.param_stat, &self.prob)
    }

    fn import_param(&mut self, param: &ParamExport) -> Diagnostics {
        let mut prob = match imported_values(&self.id, param, self.prob.len()) {
            Ok(values) => values,
            Err(d) => return d,
        };
        for (k, row) in prob.chunks_mut(self.nb_modality.max(1)).enumerate() {
            let total: f64 = row.iter().sum();
            if total <= 0.0 || row.iter().any(|p| *p < 0.0) {
                return Diagnostic::model_mismatch(format!(
                    "probabilities of class {} are not a distribution",
                    k as i64 + MIN_MODALITY
                ))
                .for_variable(&self.id)
                .into();
            }
            row.iter_mut().for_each(|p| *p /= total);
        }
        self.set_prob(prob)
    }

    fn param_str(&self) -> String {
        format!("nModality: {}", self.nb_modality)
    }

    fn imputed(&self) -> Vec<ImputedValue> {
        self.data_stat.export(MIN_MODALITY as f64)
    }

    fn completed_data(&self) -> Vec<f64> {
        self.augmented
            .data
            .iter()
            .map(|m| (m + MIN_MODALITY) as f64)
            .collect()
    }
}
