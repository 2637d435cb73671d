//! Run mode shared by the data layer and the variable models.

use serde::{Deserialize, Serialize};

/// Whether parameters are being estimated or reused.
///
/// In learning mode parameter spaces may be deduced from the data and class
/// populations are enforced; in prediction mode the parameter string must be
/// supplied verbatim and no population check is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Learning,
    Prediction,
}

impl RunMode {
    /// Whether the minimum class population has to be enforced.
    pub fn check_class_population(&self) -> bool {
        matches!(self, RunMode::Learning)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Learning => write!(f, "learning"),
            RunMode::Prediction => write!(f, "prediction"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "learn" | "learning" => Ok(RunMode::Learning),
            "predict" | "prediction" => Ok(RunMode::Prediction),
            _ => Err(format!("unknown run mode: {}", s)),
        }
    }
}
