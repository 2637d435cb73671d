//! Mixture composer core.
//!
//! Latent-class clustering of heterogeneous, partially observed data by
//! stochastic EM and Gibbs sampling:
//! - [`data`]: augmented columns, missing-value encodings and their parser
//! - [`mixture`]: the variable-model contract and the built-in models
//! - [`composer`]: latent state and the E, S and M steps
//! - [`strategy`]: SEM with bounded restarts, then Gibbs sampling
//! - [`manager`]: model registry and data ingestion
//! - [`learn`]: estimation and prediction, each behind one call

pub mod composer;
pub mod data;
pub mod exec;
pub mod learn;
pub mod logging;
pub mod manager;
pub mod mixture;
pub mod rng;
pub mod stat;
pub mod strategy;

pub use composer::{ComposerError, ComposerState, MixtureComposer, Z_CLASS};
pub use learn::{learn, learn_with, predict, predict_with, LearnOutput, Likelihoods};
pub use manager::{DataHandler, InMemoryDataHandler, MixtureManager, VariableData, VariableSpec};
pub use mixture::{Mixture, ModelContext, ParamExport};
pub use stat::ImputedValue;
pub use strategy::{GibbsStrategy, SemReport, SemStrategy};
