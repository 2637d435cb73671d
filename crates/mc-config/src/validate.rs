//! Configuration validation errors and semantic validation.

use crate::strategy::StrategyConfig;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

/// Validate a strategy configuration semantically.
pub fn validate_strategy(config: &StrategyConfig) -> ValidationResult<()> {
    require_positive("nb_cluster", config.nb_cluster)?;
    require_positive("n_sem_try", config.n_sem_try)?;
    require_positive("n_init_per_class", config.n_init_per_class)?;
    require_positive("nb_iter", config.nb_iter)?;
    require_positive("nb_gibbs_iter", config.nb_gibbs_iter)?;
    require_positive("nb_sampling_attempts", config.nb_sampling_attempts)?;
    require_positive("modulo_mis_class", config.modulo_mis_class)?;

    if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
        return Err(ValidationError::InvalidValue {
            field: "confidence_level".to_string(),
            message: format!("Must be in (0, 1), got {}", config.confidence_level),
        });
    }

    Ok(())
}

/// Validate a configuration against the size of the data set.
///
/// With `nb_cluster * (min_ind_per_class + 1) > nb_sample` no label vector can
/// satisfy the population constraint and every sampling attempt would fail.
pub fn validate_against_sample(config: &StrategyConfig, nb_sample: usize) -> ValidationResult<()> {
    validate_strategy(config)?;
    let required = config
        .nb_cluster
        .saturating_mul(config.min_ind_per_class.saturating_add(1));
    if required > nb_sample {
        return Err(ValidationError::SemanticError(format!(
            "{} classes of more than {} individuals need at least {} individuals, data has {}",
            config.nb_cluster, config.min_ind_per_class, required, nb_sample
        )));
    }
    Ok(())
}

fn require_positive(field: &str, value: usize) -> ValidationResult<()> {
    if value == 0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    Ok(())
}
