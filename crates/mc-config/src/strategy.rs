//! Strategy configuration types.
//!
//! Every field has a default so that a partial JSON document such as
//! `{"nb_cluster": 3, "seed": 7}` is a complete configuration.

use serde::{Deserialize, Serialize};

/// Parameters of the SEM and Gibbs strategies and of the class-population
/// retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Number of classes.
    pub nb_cluster: usize,

    /// Maximum number of full SEM attempts before giving up.
    pub n_sem_try: usize,

    /// Upper bound on the individuals per class used to initialise parameters.
    pub n_init_per_class: usize,

    /// SEM burn-in iterations (parameters not stored).
    pub nb_burn_in_iter: usize,

    /// SEM run iterations (parameters stored in running statistics).
    pub nb_iter: usize,

    /// Gibbs burn-in iterations per individual.
    pub nb_gibbs_burn_in_iter: usize,

    /// Gibbs run iterations per individual.
    pub nb_gibbs_iter: usize,

    /// Confidence level of the exported parameter intervals, in (0, 1).
    pub confidence_level: f64,

    /// A class must hold strictly more individuals than this after sampling.
    pub min_ind_per_class: usize,

    /// Full label redraws allowed before a population failure is reported.
    pub nb_sampling_attempts: usize,

    /// Cadence of the class-unlocking step during SEM burn-in.
    pub modulo_mis_class: usize,

    /// Seed of the master random generator; `None` draws one from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Run per-individual and per-variable passes on the rayon pool.
    pub parallel: bool,

    /// A categorical modality never observed in a class is a degeneracy
    /// that abandons the SEM attempt.
    pub strict_modalities: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            nb_cluster: 2,
            n_sem_try: 20,
            n_init_per_class: 10,
            nb_burn_in_iter: 50,
            nb_iter: 50,
            nb_gibbs_burn_in_iter: 50,
            nb_gibbs_iter: 50,
            confidence_level: 0.95,
            min_ind_per_class: 5,
            nb_sampling_attempts: 100,
            modulo_mis_class: 10,
            seed: None,
            parallel: false,
            strict_modalities: false,
        }
    }
}

impl StrategyConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse a configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// Load and validate in one call.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let config = Self::from_file(path)?;
        crate::validate::validate_strategy(&config)?;
        Ok(config)
    }

    /// Whether `iter` of the SEM burn-in uses the class-unlocking step.
    pub fn is_mis_clas_iteration(&self, iter: usize) -> bool {
        self.modulo_mis_class > 0
            && iter / self.modulo_mis_class > 0
            && iter % self.modulo_mis_class == 0
    }

    pub fn with_nb_cluster(mut self, nb_cluster: usize) -> Self {
        self.nb_cluster = nb_cluster;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_strict_modalities(mut self, strict: bool) -> Self {
        self.strict_modalities = strict;
        self
    }

    /// Set the SEM burn-in and run lengths.
    pub fn with_sem_iterations(mut self, burn_in: usize, run: usize) -> Self {
        self.nb_burn_in_iter = burn_in;
        self.nb_iter = run;
        self
    }

    /// Set the Gibbs burn-in and run lengths.
    pub fn with_gibbs_iterations(mut self, burn_in: usize, run: usize) -> Self {
        self.nb_gibbs_burn_in_iter = burn_in;
        self.nb_gibbs_iter = run;
        self
    }
}
