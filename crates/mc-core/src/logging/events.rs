//! Event names and stages attached to estimation log records.

use serde::{Deserialize, Serialize};

/// Stage of a run an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration checks and model construction.
    Setup,
    /// SEM attempts, burn-in and run.
    Sem,
    /// Gibbs burn-in and run.
    Gibbs,
    /// Likelihoods and parameter export.
    Output,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[Stage::Setup, Stage::Sem, Stage::Gibbs, Stage::Output];

    /// Prefixes of the event names emitted in this stage.
    pub fn event_prefixes(&self) -> &'static [&'static str] {
        match self {
            Stage::Setup => &[event_names::LEARN_STARTED, event_names::PREDICT_STARTED, "setup"],
            Stage::Sem => &["sem"],
            Stage::Gibbs => &["gibbs"],
            Stage::Output => &[event_names::LEARN_FINISHED, event_names::PREDICT_FINISHED],
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .find(|stage| stage.to_string().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown stage: {}", s))
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Setup => "setup",
            Stage::Sem => "sem",
            Stage::Gibbs => "gibbs",
            Stage::Output => "output",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names, used as tracing targets.
pub mod event_names {
    pub const LEARN_STARTED: &str = "learn.started";
    pub const LEARN_FINISHED: &str = "learn.finished";
    pub const PREDICT_STARTED: &str = "predict.started";
    pub const PREDICT_FINISHED: &str = "predict.finished";

    pub const SETUP_VARIABLE_CREATED: &str = "setup.variable_created";
    pub const SETUP_DATA_WARNING: &str = "setup.data_warning";

    pub const SEM_ATTEMPT_STARTED: &str = "sem.attempt_started";
    pub const SEM_ATTEMPT_ABANDONED: &str = "sem.attempt_abandoned";
    pub const SEM_ITERATION: &str = "sem.iteration";
    pub const SEM_FINISHED: &str = "sem.finished";

    pub const GIBBS_STARTED: &str = "gibbs.started";
    pub const GIBBS_FINISHED: &str = "gibbs.finished";
}
