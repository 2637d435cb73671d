//! Mixture composer configuration loading and validation.
//!
//! This crate provides:
//! - The typed strategy configuration consumed by the SEM and Gibbs strategies
//! - Named presets for common run lengths
//! - Semantic validation with stable error codes

pub mod preset;
pub mod strategy;
pub mod validate;

pub use preset::{get_preset, PresetName};
pub use strategy::StrategyConfig;
pub use validate::{validate_against_sample, validate_strategy, ValidationError, ValidationResult};
