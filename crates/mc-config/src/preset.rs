//! Configuration presets for common run lengths.
//!
//! Provides pre-built strategies for:
//! - Quick: short chains for smoke runs and tests
//! - Standard: the default chain lengths
//! - Thorough: long chains and more restarts for final estimates

use crate::strategy::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Short chains, few restarts
    Quick,
    /// Default chain lengths
    Standard,
    /// Long chains, many restarts
    Thorough,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] =
        &[PresetName::Quick, PresetName::Standard, PresetName::Thorough];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Quick => "quick",
            PresetName::Standard => "standard",
            PresetName::Thorough => "thorough",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "quick" | "fast" | "smoke" => Some(PresetName::Quick),
            "standard" | "default" => Some(PresetName::Standard),
            "thorough" | "long" | "final" => Some(PresetName::Thorough),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Quick => "Short SEM and Gibbs chains, for smoke runs and tests",
            PresetName::Standard => "Default chain lengths and retry budget",
            PresetName::Thorough => "Long chains and a large restart budget for final estimates",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Get the strategy for a preset.
pub fn get_preset(name: PresetName) -> StrategyConfig {
    match name {
        PresetName::Quick => StrategyConfig {
            n_sem_try: 5,
            n_init_per_class: 5,
            nb_burn_in_iter: 10,
            nb_iter: 20,
            nb_gibbs_burn_in_iter: 10,
            nb_gibbs_iter: 20,
            ..StrategyConfig::default()
        },
        PresetName::Standard => StrategyConfig::default(),
        PresetName::Thorough => StrategyConfig {
            n_sem_try: 50,
            n_init_per_class: 50,
            nb_burn_in_iter: 200,
            nb_iter: 500,
            nb_gibbs_burn_in_iter: 100,
            nb_gibbs_iter: 200,
            nb_sampling_attempts: 500,
            ..StrategyConfig::default()
        },
    }
}

/// List presets with their descriptions.
pub fn list_presets() -> Vec<(PresetName, &'static str)> {
    PresetName::ALL
        .iter()
        .map(|p| (*p, p.description()))
        .collect()
}
