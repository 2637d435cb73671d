//! Mixture composer.
//!
//! The composer owns the latent state of a run (class labels `zi`,
//! responsibilities `tik`, proportions `prop`) together with every registered
//! variable model, and exposes the E, S and M steps that the strategies
//! sequence. Models only ever receive the class indices or the label they
//! need for one call; they never hold a reference to composer storage.
//!
//! ```text
//! Created ──initialize_step──▶ Initialized ──▶ SemBurnIn ◀──▶ SemRun
//!                                   │                            │
//!                                   └────────▶ GibbsBurnIn ◀─────┘
//!                                                  │
//!                                              GibbsRun ──▶ Finalized
//! ```

use crate::data::{AugmentedData, MisVal};
use crate::exec::{map_indices, map_mut};
use crate::mixture::{Mixture, ParamExport};
use crate::rng::{self, McRng};
use crate::stat::RunningStatistic;
use mc_common::{Diagnostic, Diagnostics, RunMode, MIN_MODALITY};
use mc_config::StrategyConfig;
use mc_math::{argmax, categorical_index, log_sum_exp, normalize_log_weights};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Identifier under which the class proportions are exported.
pub const Z_CLASS: &str = "z_class";

/// Lifecycle of a composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposerState {
    Created,
    Initialized,
    SemBurnIn,
    SemRun,
    GibbsBurnIn,
    GibbsRun,
    Finalized,
}

impl ComposerState {
    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: ComposerState) -> bool {
        use ComposerState::*;
        matches!(
            (self, next),
            (Initialized, SemBurnIn)
                | (SemBurnIn, SemBurnIn)
                | (SemBurnIn, SemRun)
                | (SemRun, SemBurnIn)
                | (SemRun, GibbsBurnIn)
                | (Initialized, GibbsBurnIn)
                | (GibbsBurnIn, GibbsRun)
                | (GibbsRun, Finalized)
        )
    }
}

impl fmt::Display for ComposerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComposerState::Created => "created",
            ComposerState::Initialized => "initialized",
            ComposerState::SemBurnIn => "sem_burn_in",
            ComposerState::SemRun => "sem_run",
            ComposerState::GibbsBurnIn => "gibbs_burn_in",
            ComposerState::GibbsRun => "gibbs_run",
            ComposerState::Finalized => "finalized",
        };
        write!(f, "{}", s)
    }
}

/// Misuse of the composer API.
#[derive(Debug, Error, PartialEq)]
pub enum ComposerError {
    #[error("{operation} called before initialize_step")]
    NotInitialized { operation: &'static str },

    #[error("variable '{id}' registered after initialize_step")]
    RegisterAfterInit { id: String },

    #[error("variable '{id}' is already registered")]
    DuplicateVariable { id: String },

    #[error("variable '{id}' holds {actual} individuals, composer expects {expected}")]
    SampleSizeMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ComposerState,
        to: ComposerState,
    },

    #[error("initialize_step called twice")]
    AlreadyInitialized,

    #[error("no variable registered")]
    NoVariable,

    #[error("{what} has length {actual}, expected {expected}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid proportions: {0}")]
    InvalidProportions(String),
}

impl From<ComposerError> for mc_common::Error {
    fn from(err: ComposerError) -> Self {
        match err {
            ComposerError::NotInitialized { .. } => mc_common::Error::InvalidState {
                expected: ComposerState::Initialized.to_string(),
                actual: ComposerState::Created.to_string(),
            },
            ComposerError::InvalidTransition { from, to } => mc_common::Error::InvalidState {
                expected: format!("a state leading to {}", to),
                actual: from.to_string(),
            },
            other => mc_common::Error::Usage(other.to_string()),
        }
    }
}

pub struct MixtureComposer {
    nb_sample: usize,
    nb_cluster: usize,
    min_ind_per_class: usize,
    nb_sampling_attempts: usize,
    confidence_level: f64,
    parallel: bool,
    strict_modalities: bool,
    mode: RunMode,
    state: ComposerState,

    prop: Vec<f64>,
    tik: Array2<f64>,
    /// Class visit counts of the current Gibbs chain.
    nik: Array2<f64>,
    zi: AugmentedData<i64>,

    mixtures: Vec<Box<dyn Mixture>>,
    prop_stat: RunningStatistic,
    rng: McRng,
    last_sampling_attempts: usize,
}

impl MixtureComposer {
    pub fn new(nb_sample: usize, config: &StrategyConfig, mode: RunMode) -> Self {
        let nb_cluster = config.nb_cluster.max(1);
        let mut zi = AugmentedData::with_capacity(nb_sample);
        for _ in 0..nb_sample {
            zi.push(0, MisVal::Missing);
        }
        zi.pin_range(0, nb_cluster as i64 - 1);

        Self {
            nb_sample,
            nb_cluster,
            min_ind_per_class: config.min_ind_per_class,
            nb_sampling_attempts: config.nb_sampling_attempts.max(1),
            confidence_level: config.confidence_level,
            parallel: config.parallel,
            strict_modalities: config.strict_modalities,
            mode,
            state: ComposerState::Created,
            prop: vec![1.0 / nb_cluster as f64; nb_cluster],
            tik: Array2::from_elem((nb_sample, nb_cluster), 1.0 / nb_cluster as f64),
            nik: Array2::zeros((nb_sample, nb_cluster)),
            zi,
            mixtures: Vec::new(),
            prop_stat: RunningStatistic::new(config.confidence_level),
            rng: rng::master(config.seed),
            last_sampling_attempts: 0,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Hand a variable model over to the composer.
    pub fn register_mixture(&mut self, mixture: Box<dyn Mixture>) -> Result<(), ComposerError> {
        let id = mixture.id_name().to_string();
        if self.state != ComposerState::Created {
            return Err(ComposerError::RegisterAfterInit { id });
        }
        if self.mixtures.iter().any(|m| m.id_name() == id) {
            return Err(ComposerError::DuplicateVariable { id });
        }
        let actual = mixture.completed_data().len();
        if actual != self.nb_sample {
            return Err(ComposerError::SampleSizeMismatch {
                id,
                expected: self.nb_sample,
                actual,
            });
        }
        debug!(variable = %id, model = mixture.model_name(), "variable registered");
        self.mixtures.push(mixture);
        Ok(())
    }

    /// Close registration. Must be called exactly once.
    pub fn initialize_step(&mut self) -> Result<(), ComposerError> {
        if self.state != ComposerState::Created {
            return Err(ComposerError::AlreadyInitialized);
        }
        if self.mixtures.is_empty() {
            return Err(ComposerError::NoVariable);
        }
        self.state = ComposerState::Initialized;
        debug!(
            nb_sample = self.nb_sample,
            nb_cluster = self.nb_cluster,
            nb_variable = self.mixtures.len(),
            "composer initialized"
        );
        Ok(())
    }

    pub fn set_phase(&mut self, next: ComposerState) -> Result<(), ComposerError> {
        if !self.state.can_transition_to(next) {
            return Err(ComposerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        trace!(from = %self.state, to = %next, "composer phase");
        self.state = next;
        Ok(())
    }

    fn ensure_initialized(&self, operation: &'static str) -> Result<(), ComposerError> {
        if self.state == ComposerState::Created {
            return Err(ComposerError::NotInitialized { operation });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Class labels and proportions
    // ------------------------------------------------------------------

    /// Install observed class labels (0-based) and draw the missing ones.
    ///
    /// `None` leaves every label missing. Labels that reference a class out of
    /// `[0, nb_cluster)` are reported per individual and nothing is changed.
    pub fn set_z_class(&mut self, labels: Option<AugmentedData<i64>>) -> Result<Diagnostics, ComposerError> {
        if !matches!(self.state, ComposerState::Created | ComposerState::Initialized) {
            return Err(ComposerError::InvalidTransition {
                from: self.state,
                to: ComposerState::Initialized,
            });
        }
        if let Some(mut labels) = labels {
            if labels.len() != self.nb_sample {
                return Err(ComposerError::InvalidLength {
                    what: "z_class",
                    expected: self.nb_sample,
                    actual: labels.len(),
                });
            }
            let diags = self.check_label_range(&labels);
            if !diags.is_empty() {
                return Ok(diags);
            }
            labels.pin_range(0, self.nb_cluster as i64 - 1);
            self.zi = labels;
        }
        Ok(self.redraw_labels_checked())
    }

    fn check_label_range(&self, labels: &AugmentedData<i64>) -> Diagnostics {
        let k_max = self.nb_cluster as i64;
        (0..labels.len())
            .filter(|&i| match &labels.mis_data[i] {
                MisVal::Present => !(0..k_max).contains(&labels.data[i]),
                MisVal::Missing => false,
                _ => !(0..k_max).any(|k| labels.admits(i, k)),
            })
            .map(|i| {
                Diagnostic::data_format(format!(
                    "class label must lie in [{}, {}]",
                    MIN_MODALITY,
                    k_max - 1 + MIN_MODALITY
                ))
                .for_variable(Z_CLASS)
                .for_individual(i)
            })
            .collect()
    }

    /// Uniform redraw of the unobserved labels until every class is populated
    /// enough, bounded by `nb_sampling_attempts`.
    fn redraw_labels_checked(&mut self) -> Diagnostics {
        for attempt in 1..=self.nb_sampling_attempts {
            self.zi.remove_missing(&mut self.rng);
            self.last_sampling_attempts = attempt;
            if !self.mode.check_class_population() || self.min_population() > self.min_ind_per_class {
                return Diagnostics::new();
            }
        }
        self.population_diagnostic()
    }

    /// Replace the proportions, typically with those of a previous run.
    pub fn set_proportions(&mut self, prop: &[f64]) -> Result<(), ComposerError> {
        if prop.len() != self.nb_cluster {
            return Err(ComposerError::InvalidLength {
                what: "prop",
                expected: self.nb_cluster,
                actual: prop.len(),
            });
        }
        if prop.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ComposerError::InvalidProportions(
                "proportions must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = prop.iter().sum();
        if total <= 0.0 {
            return Err(ComposerError::InvalidProportions("proportions sum to zero".to_string()));
        }
        self.prop = prop.iter().map(|p| p / total).collect();
        Ok(())
    }

    /// Install the proportions and every variable's parameters from the
    /// tables of a previous run, matched by id.
    pub fn import_parameters(&mut self, params: &[ParamExport]) -> Result<Diagnostics, ComposerError> {
        self.ensure_initialized("import_parameters")?;
        let mut diags = Diagnostics::new();
        match params.iter().find(|p| p.id == Z_CLASS) {
            Some(table) => {
                if let Err(err) = self.set_proportions(&table.point_values()) {
                    diags.push(Diagnostic::model_mismatch(err.to_string()).for_variable(Z_CLASS));
                }
            }
            None => diags.push(Diagnostic::model_mismatch("no proportions provided").for_variable(Z_CLASS)),
        }
        for m in self.mixtures.iter_mut() {
            match params.iter().find(|p| p.id == m.id_name()) {
                Some(table) => diags.extend(m.import_param(table)),
                None => diags.push(Diagnostic::model_mismatch("no parameters provided").for_variable(m.id_name())),
            }
        }
        debug!(nb_table = params.len(), nb_issue = diags.len(), "parameters imported");
        Ok(diags)
    }

    /// Population of every class under the current labels.
    pub fn class_population(&self) -> Vec<usize> {
        let mut counts = vec![0; self.nb_cluster];
        for z in &self.zi.data {
            counts[*z as usize] += 1;
        }
        counts
    }

    fn min_population(&self) -> usize {
        self.class_population().into_iter().min().unwrap_or(0)
    }

    fn population_diagnostic(&self) -> Diagnostics {
        let counts = self.class_population();
        let (worst, count) = counts
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| **c)
            .map(|(k, c)| (k, *c))
            .unwrap_or((0, 0));
        Diagnostic::degeneracy(format!(
            "class {} holds {} individuals after {} sampling attempts, more than {} are required",
            worst as i64 + MIN_MODALITY,
            count,
            self.last_sampling_attempts,
            self.min_ind_per_class
        ))
        .for_variable(Z_CLASS)
        .into()
    }

    /// Individuals of each class.
    pub fn class_indices(&self) -> Vec<Vec<usize>> {
        let mut ind = vec![Vec::new(); self.nb_cluster];
        for (i, z) in self.zi.data.iter().enumerate() {
            ind[*z as usize].push(i);
        }
        ind
    }

    // ------------------------------------------------------------------
    // E step
    // ------------------------------------------------------------------

    fn ln_observed_row(&self, i: usize) -> Vec<f64> {
        (0..self.nb_cluster)
            .map(|k| {
                self.prop[k].ln()
                    + self
                        .mixtures
                        .iter()
                        .map(|m| m.ln_observed_probability(i, k))
                        .sum::<f64>()
            })
            .collect()
    }

    fn ln_completed_row_entry(&self, i: usize, k: usize) -> f64 {
        self.prop[k].ln()
            + self
                .mixtures
                .iter()
                .map(|m| m.ln_completed_probability(i, k))
                .sum::<f64>()
    }

    /// Restrict a log row to the classes the label of `i` allows, falling back
    /// to uniform over them when none has positive weight.
    fn constrain_row(&self, i: usize, ln_row: &mut [f64]) {
        if matches!(self.zi.mis_data[i], MisVal::Missing) {
            return;
        }
        let mut any_mass = false;
        for (k, v) in ln_row.iter_mut().enumerate() {
            if self.zi.admits(i, k as i64) {
                any_mass |= *v > f64::NEG_INFINITY;
            } else {
                *v = f64::NEG_INFINITY;
            }
        }
        if !any_mass {
            for (k, v) in ln_row.iter_mut().enumerate() {
                if self.zi.admits(i, k as i64) {
                    *v = 0.0;
                }
            }
        }
    }

    fn normalized_row(&self, i: usize, mut ln_row: Vec<f64>) -> Vec<f64> {
        self.constrain_row(i, &mut ln_row);
        normalize_log_weights(&mut ln_row);
        ln_row
    }

    fn write_tik_row(&mut self, i: usize, row: &[f64]) {
        for (k, v) in row.iter().enumerate() {
            self.tik[[i, k]] = *v;
        }
    }

    /// Posterior class probabilities of every individual.
    pub fn e_step(&mut self) -> Result<(), ComposerError> {
        self.ensure_initialized("e_step")?;
        let rows = map_indices(self.parallel, self.nb_sample, |i| {
            self.normalized_row(i, self.ln_observed_row(i))
        });
        for (i, row) in rows.iter().enumerate() {
            self.write_tik_row(i, row);
        }
        Ok(())
    }

    pub fn e_step_individual(&mut self, i: usize) -> Result<(), ComposerError> {
        self.ensure_initialized("e_step_individual")?;
        let row = self.normalized_row(i, self.ln_observed_row(i));
        self.write_tik_row(i, &row);
        Ok(())
    }

    /// E step on completed probabilities, each class tried in turn.
    ///
    /// For every class `k` all latent values are redrawn as if every
    /// individual belonged to `k`; `zi` itself is left alone.
    pub fn mis_clas_step(&mut self, iteration: usize) -> Result<(), ComposerError> {
        self.ensure_initialized("mis_clas_step")?;
        debug!(iteration, "class unlocking step");
        let seed = rng::next_pass_seed(&mut self.rng);
        let (n, nb_cluster, parallel) = (self.nb_sample, self.nb_cluster, self.parallel);
        let mut ln_comp = Array2::<f64>::zeros((n, nb_cluster));

        for k in 0..nb_cluster {
            map_mut(parallel, &mut self.mixtures, |j, m| {
                let mut r = rng::stream(seed, j * nb_cluster + k);
                for i in 0..n {
                    m.sampling_step(i, k, &mut r);
                }
            });
            let column = map_indices(parallel, n, |i| self.ln_completed_row_entry(i, k));
            for (i, v) in column.into_iter().enumerate() {
                ln_comp[[i, k]] = v;
            }
        }

        for i in 0..n {
            let row = self.normalized_row(i, ln_comp.row(i).to_vec());
            self.write_tik_row(i, &row);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // S step
    // ------------------------------------------------------------------

    fn draw_label(&self, i: usize, rng: &mut McRng) -> i64 {
        if self.zi.is_present(i) {
            return self.zi.data[i];
        }
        let mut weights = self.tik.row(i).to_vec();
        if !matches!(self.zi.mis_data[i], MisVal::Missing) {
            for (k, w) in weights.iter_mut().enumerate() {
                if !self.zi.admits(i, k as i64) {
                    *w = 0.0;
                }
            }
            if weights.iter().sum::<f64>() <= 0.0 {
                for (k, w) in weights.iter_mut().enumerate() {
                    *w = if self.zi.admits(i, k as i64) { 1.0 } else { 0.0 };
                }
            }
        }
        match categorical_index(&weights, rng.random::<f64>()) {
            Some(k) => k as i64,
            None => self.zi.data[i],
        }
    }

    /// Draw every unobserved label from its `tik` row.
    ///
    /// Returns the smallest class population after the pass.
    pub fn s_step(&mut self) -> Result<usize, ComposerError> {
        self.ensure_initialized("s_step")?;
        let seed = rng::next_pass_seed(&mut self.rng);
        let labels = map_indices(self.parallel, self.nb_sample, |i| {
            self.draw_label(i, &mut rng::stream(seed, i))
        });
        self.zi.data = labels;
        Ok(self.min_population())
    }

    pub fn s_step_individual(&mut self, i: usize, rng: &mut McRng) -> Result<(), ComposerError> {
        self.ensure_initialized("s_step_individual")?;
        self.zi.data[i] = self.draw_label(i, rng);
        Ok(())
    }

    /// S step repeated until every class holds more than
    /// `min_ind_per_class` individuals.
    ///
    /// Gives up after `nb_sampling_attempts` draws with a degeneracy
    /// diagnostic naming the least populated class. In prediction mode a
    /// single draw is accepted.
    pub fn s_step_checked(&mut self) -> Result<Diagnostics, ComposerError> {
        for attempt in 1..=self.nb_sampling_attempts {
            let min_population = self.s_step()?;
            self.last_sampling_attempts = attempt;
            if !self.mode.check_class_population() || min_population > self.min_ind_per_class {
                return Ok(Diagnostics::new());
            }
        }
        Ok(self.population_diagnostic())
    }

    /// Number of draws used by the last checked label sampling.
    pub fn last_sampling_attempts(&self) -> usize {
        self.last_sampling_attempts
    }

    /// Maximum a posteriori label for every unobserved individual.
    pub fn map_step(&mut self) -> Result<(), ComposerError> {
        self.ensure_initialized("map_step")?;
        for i in 0..self.nb_sample {
            self.map_label(i);
        }
        Ok(())
    }

    pub fn map_step_individual(&mut self, i: usize) -> Result<(), ComposerError> {
        self.ensure_initialized("map_step_individual")?;
        self.map_label(i);
        Ok(())
    }

    fn map_label(&mut self, i: usize) {
        if self.zi.is_present(i) {
            return;
        }
        let row = self.tik.row(i).to_vec();
        if let Some(k) = argmax(&row) {
            self.zi.data[i] = k as i64;
        }
    }

    // ------------------------------------------------------------------
    // Sampling and M step
    // ------------------------------------------------------------------

    /// Redraw the latent values of every variable given `zi`.
    pub fn sampling_step(&mut self) -> Result<(), ComposerError> {
        self.ensure_initialized("sampling_step")?;
        let seed = rng::next_pass_seed(&mut self.rng);
        let z = self.zi();
        map_mut(self.parallel, &mut self.mixtures, |j, m| {
            let mut r = rng::stream(seed, j);
            for (i, z_i) in z.iter().enumerate() {
                m.sampling_step(i, *z_i, &mut r);
            }
        });
        Ok(())
    }

    pub fn sampling_step_individual(&mut self, i: usize, rng: &mut McRng) -> Result<(), ComposerError> {
        self.ensure_initialized("sampling_step_individual")?;
        let z_i = self.zi.data[i] as usize;
        for m in self.mixtures.iter_mut() {
            m.sampling_step(i, z_i, rng);
        }
        Ok(())
    }

    /// Proportions from the current class populations.
    fn p_step(&mut self) {
        let n = self.nb_sample.max(1) as f64;
        self.prop = self
            .class_population()
            .into_iter()
            .map(|c| c as f64 / n)
            .collect();
    }

    /// Re-estimate proportions and every model's parameters from `zi`.
    ///
    /// Diagnostics are returned in registration order. Parameters are fixed
    /// in prediction mode and nothing is estimated.
    pub fn m_step(&mut self) -> Result<Diagnostics, ComposerError> {
        self.ensure_initialized("m_step")?;
        if self.mode == RunMode::Prediction {
            return Ok(Diagnostics::new());
        }
        self.p_step();
        let class_ind = self.class_indices();
        let per_variable = map_mut(self.parallel, &mut self.mixtures, |_, m| m.m_step(&class_ind));
        let mut diags = Diagnostics::new();
        for d in per_variable {
            diags.extend(d);
        }
        Ok(diags)
    }

    /// Class populations and each model's own requirements for the next
    /// M step.
    pub fn check_sample_condition(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if self.mode == RunMode::Prediction {
            return diags;
        }
        let class_ind = self.class_indices();
        for (k, members) in class_ind.iter().enumerate() {
            if members.is_empty() {
                diags.push(
                    Diagnostic::degeneracy(format!("class {} is empty", k as i64 + MIN_MODALITY))
                        .for_variable(Z_CLASS),
                );
            }
        }
        for m in &self.mixtures {
            diags.extend(m.check_sample_condition(&class_ind));
        }
        diags
    }

    // ------------------------------------------------------------------
    // Initialization of an estimation attempt
    // ------------------------------------------------------------------

    /// Complete every missing value and label without using parameters.
    pub fn init_data(&mut self) -> Result<Diagnostics, ComposerError> {
        self.ensure_initialized("init_data")?;
        let seed = rng::next_pass_seed(&mut self.rng);
        map_mut(self.parallel, &mut self.mixtures, |j, m| {
            m.init_data(&mut rng::stream(seed, j));
        });
        Ok(self.redraw_labels_checked())
    }

    /// Initial parameters from a random sub-partition holding at most
    /// `n_init_per_class` individuals of each class.
    pub fn init_param(&mut self, n_init_per_class: usize) -> Result<Diagnostics, ComposerError> {
        self.ensure_initialized("init_param")?;
        if self.mode == RunMode::Prediction {
            return Ok(Diagnostics::new());
        }
        self.p_step();
        let mut sub_partition = self.class_indices();
        for members in sub_partition.iter_mut() {
            let keep = n_init_per_class.min(members.len());
            for slot in 0..keep {
                let pick = self.rng.random_range(slot..members.len());
                members.swap(slot, pick);
            }
            members.truncate(keep);
            members.sort_unstable();
        }
        let per_variable = map_mut(self.parallel, &mut self.mixtures, |_, m| m.m_step(&sub_partition));
        let mut diags = Diagnostics::new();
        for d in per_variable {
            diags.extend(d);
        }
        Ok(diags)
    }

    /// Seed the labels and latent values from the initial parameters.
    pub fn initialize_latent(&mut self) -> Result<Diagnostics, ComposerError> {
        self.e_step()?;
        let diags = self.s_step_checked()?;
        if !diags.is_empty() {
            return Ok(diags);
        }
        self.sampling_step()?;
        Ok(self.check_sample_condition())
    }

    // ------------------------------------------------------------------
    // Likelihoods and criteria
    // ------------------------------------------------------------------

    /// `Σ_i log Σ_k prop_k p(x_i | k)`, missing values marginalised.
    pub fn ln_observed_likelihood(&self) -> f64 {
        map_indices(self.parallel, self.nb_sample, |i| log_sum_exp(&self.ln_observed_row(i)))
            .into_iter()
            .sum()
    }

    /// `Σ_i log prop_{z_i} p(x̃_i | z_i)` on the completed data.
    pub fn ln_completed_likelihood(&self) -> f64 {
        map_indices(self.parallel, self.nb_sample, |i| {
            self.ln_completed_row_entry(i, self.zi.data[i] as usize)
        })
        .into_iter()
        .sum()
    }

    /// `Σ_i log prop_{z_i} p(x_i | z_i)`, missing values marginalised.
    pub fn ln_semi_completed_likelihood(&self) -> f64 {
        map_indices(self.parallel, self.nb_sample, |i| {
            let k = self.zi.data[i] as usize;
            self.prop[k].ln()
                + self
                    .mixtures
                    .iter()
                    .map(|m| m.ln_observed_probability(i, k))
                    .sum::<f64>()
        })
        .into_iter()
        .sum()
    }

    /// Free proportions plus every model's free parameters.
    pub fn nb_free_parameters(&self) -> usize {
        self.nb_cluster - 1
            + self
                .mixtures
                .iter()
                .map(|m| m.nb_free_parameter())
                .sum::<usize>()
    }

    fn penalty(&self) -> f64 {
        0.5 * self.nb_free_parameters() as f64 * (self.nb_sample.max(1) as f64).ln()
    }

    pub fn bic(&self) -> f64 {
        self.ln_observed_likelihood() - self.penalty()
    }

    pub fn icl(&self) -> f64 {
        self.ln_semi_completed_likelihood() - self.penalty()
    }

    // ------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------

    pub fn store_sem_burn_in(&mut self, iteration: usize, iteration_max: usize) -> Result<(), ComposerError> {
        self.ensure_initialized("store_sem_burn_in")?;
        for m in self.mixtures.iter_mut() {
            m.store_sem_burn_in(iteration, iteration_max);
        }
        Ok(())
    }

    /// Record proportions and parameters. At `iteration_max` every estimate
    /// is replaced by its mean over the run.
    pub fn store_sem_run(&mut self, iteration: usize, iteration_max: usize) -> Result<(), ComposerError> {
        self.ensure_initialized("store_sem_run")?;
        if self.prop_stat.sample(iteration, iteration_max, &self.prop) && self.mode == RunMode::Learning {
            let means = self.prop_stat.means();
            let total: f64 = means.iter().sum();
            if total > 0.0 {
                self.prop = means.iter().map(|p| p / total).collect();
            }
        }
        for m in self.mixtures.iter_mut() {
            m.store_sem_run(iteration, iteration_max);
        }
        Ok(())
    }

    /// Count the class visited by `i`; at `iteration_max` the visit
    /// frequencies become its `tik` row.
    pub fn store_gibbs_run(&mut self, i: usize, iteration: usize, iteration_max: usize) -> Result<(), ComposerError> {
        self.ensure_initialized("store_gibbs_run")?;
        let z = self.zi.data[i] as usize;
        if iteration == 0 {
            self.nik.row_mut(i).fill(0.0);
        }
        self.nik[[i, z]] += 1.0;
        if iteration == iteration_max {
            let total = (iteration_max + 1) as f64;
            for k in 0..self.nb_cluster {
                self.tik[[i, k]] = self.nik[[i, k]] / total;
            }
        }
        for m in self.mixtures.iter_mut() {
            m.store_gibbs_run(i, iteration, iteration_max);
        }
        Ok(())
    }

    /// One Gibbs chain of `nb_iter` iterations per individual, followed by a
    /// MAP pass over the labels.
    pub fn gibbs_sampling(&mut self, nb_iter: usize, store: bool) -> Result<(), ComposerError> {
        self.ensure_initialized("gibbs_sampling")?;
        let seed = rng::next_pass_seed(&mut self.rng);
        for i in 0..self.nb_sample {
            let mut r = rng::stream(seed, i);
            for iteration in 0..nb_iter {
                self.e_step_individual(i)?;
                self.s_step_individual(i, &mut r)?;
                self.sampling_step_individual(i, &mut r)?;
                if store {
                    self.store_gibbs_run(i, iteration, nb_iter - 1)?;
                }
            }
        }
        self.map_step()
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Parameter tables, class proportions first.
    pub fn export_parameters(&self) -> Vec<ParamExport> {
        let names = (0..self.nb_cluster)
            .map(|k| format!("k: {}", k as i64 + MIN_MODALITY))
            .collect();
        let mut out = vec![ParamExport::from_stat(Z_CLASS, names, &self.prop_stat, &self.prop)];
        out.extend(self.mixtures.iter().map(|m| m.export_param()));
        out
    }

    pub fn write_parameters(&self) -> String {
        let mut out = String::from("z_class\n");
        for (k, p) in self.prop.iter().enumerate() {
            out.push_str(&format!("\tclass {}: prop = {}\n", k as i64 + MIN_MODALITY, p));
        }
        for m in &self.mixtures {
            out.push_str(&format!("{} ({})\n", m.id_name(), m.model_name()));
            out.push_str(&m.write_parameters());
        }
        out
    }

    pub fn nb_sample(&self) -> usize {
        self.nb_sample
    }

    pub fn nb_cluster(&self) -> usize {
        self.nb_cluster
    }

    pub fn nb_variable(&self) -> usize {
        self.mixtures.len()
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn strict_modalities(&self) -> bool {
        self.strict_modalities
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn prop(&self) -> &[f64] {
        &self.prop
    }

    pub fn tik(&self) -> &Array2<f64> {
        &self.tik
    }

    /// Current labels, 0-based.
    pub fn zi(&self) -> Vec<usize> {
        self.zi.data.iter().map(|z| *z as usize).collect()
    }

    /// Current labels in the external 1-based encoding.
    pub fn labels(&self) -> Vec<i64> {
        self.zi.data.iter().map(|z| z + MIN_MODALITY).collect()
    }

    pub fn mixtures(&self) -> impl Iterator<Item = &dyn Mixture> + '_ {
        self.mixtures.iter().map(|m| m.as_ref())
    }
}
