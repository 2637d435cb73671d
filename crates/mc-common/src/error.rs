//! Error types for the mixture composer.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints (whether a fresh SEM attempt may succeed)
//! - Short headlines for human output
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 31,
//!   "category": "estimation",
//!   "message": "all 20 SEM attempts failed: ...",
//!   "recoverable": true,
//!   "context": { "attempts": 20 }
//! }
//! ```

use crate::diagnostic::{DiagnosticKind, Diagnostics};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for composer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Strategy configuration and parameter-space declarations.
    Config,
    /// Data ingestion and missing-value encodings.
    Data,
    /// Degeneracy and numerical failures during estimation.
    Estimation,
    /// Operations invoked in the wrong composer state.
    Usage,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Estimation => write!(f, "estimation"),
            ErrorCategory::Usage => write!(f, "usage"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the mixture composer.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("invalid strategy parameters: {0}")]
    InvalidStrategy(String),

    #[error("variable '{variable}': parameter space mismatch: {message}")]
    ModelMismatch { variable: String, message: String },

    #[error("model '{model}' requested for variable '{variable}' is not implemented")]
    UnknownModel { variable: String, model: String },

    // Data errors (20-29)
    #[error("variable '{variable}': {message}")]
    DataFormat { variable: String, message: String },

    #[error("variable '{variable}' has no valid individual")]
    NoValidRows { variable: String },

    // Estimation errors (30-39)
    #[error("degenerate model: {0}")]
    Degeneracy(String),

    #[error("all {attempts} SEM attempts failed: {detail}")]
    AttemptsExhausted { attempts: usize, detail: String },

    #[error("optimizer failure: {0}")]
    Optimizer(String),

    // Usage errors (40-49)
    #[error("invalid composer state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("usage error: {0}")]
    Usage(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data errors
    /// - 30-39: Estimation errors
    /// - 40-49: Usage errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidStrategy(_) => 11,
            Error::ModelMismatch { .. } => 12,
            Error::UnknownModel { .. } => 13,
            Error::DataFormat { .. } => 20,
            Error::NoValidRows { .. } => 21,
            Error::Degeneracy(_) => 30,
            Error::AttemptsExhausted { .. } => 31,
            Error::Optimizer(_) => 33,
            Error::InvalidState { .. } => 40,
            Error::Usage(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidStrategy(_)
            | Error::ModelMismatch { .. }
            | Error::UnknownModel { .. } => ErrorCategory::Config,

            Error::DataFormat { .. } | Error::NoValidRows { .. } => ErrorCategory::Data,

            Error::Degeneracy(_)
            | Error::AttemptsExhausted { .. }
            | Error::Optimizer(_) => ErrorCategory::Estimation,

            Error::InvalidState { .. } | Error::Usage(_) => ErrorCategory::Usage,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether a new estimation attempt may resolve the error.
    ///
    /// Data and configuration problems are deterministic: rerunning with the
    /// same inputs fails the same way.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Degeneracy(_) => true,
            Error::AttemptsExhausted { .. } => true, // more attempts or fewer classes
            Error::Optimizer(_) => true,
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidStrategy(_) => "Invalid Strategy Parameters",
            Error::ModelMismatch { .. } => "Parameter Space Mismatch",
            Error::UnknownModel { .. } => "Unknown Model",
            Error::DataFormat { .. } => "Data Format Error",
            Error::NoValidRows { .. } => "No Valid Individual",
            Error::Degeneracy(_) => "Degenerate Model",
            Error::AttemptsExhausted { .. } => "Estimation Failed",
            Error::Optimizer(_) => "Optimizer Failure",
            Error::InvalidState { .. } => "Invalid Composer State",
            Error::Usage(_) => "Usage Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Convert a non-empty diagnostic list into a single error.
    ///
    /// The category follows the first diagnostic, except that an empty column
    /// anywhere in the list wins; the message joins all of them.
    pub fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        if let Some(d) = diagnostics.iter().find(|d| d.kind == DiagnosticKind::EmptyColumn) {
            return Error::NoValidRows {
                variable: d.variable.clone().unwrap_or_default(),
            };
        }
        let detail = diagnostics.to_string();
        let first = diagnostics.iter().next();
        let variable = first
            .and_then(|d| d.variable.clone())
            .unwrap_or_else(|| "z_class".to_string());
        match first.map(|d| d.kind) {
            Some(DiagnosticKind::DataFormat | DiagnosticKind::EmptyColumn) => Error::DataFormat {
                variable,
                message: detail,
            },
            Some(DiagnosticKind::ModelMismatch) => Error::ModelMismatch {
                variable,
                message: detail,
            },
            Some(DiagnosticKind::Degeneracy) => Error::Degeneracy(detail),
            Some(DiagnosticKind::Optimizer) => Error::Optimizer(detail),
            Some(DiagnosticKind::Usage) => Error::Usage(detail),
            None => Error::Usage("empty diagnostic list".to_string()),
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether a fresh attempt may succeed.
    pub recoverable: bool,

    /// Additional structured context (variable, attempts, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::ModelMismatch { variable, .. }
            | Error::DataFormat { variable, .. }
            | Error::NoValidRows { variable } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
            }
            Error::UnknownModel { variable, model } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
                context.insert("model".to_string(), serde_json::json!(model));
            }
            Error::AttemptsExhausted { attempts, .. } => {
                context.insert("attempts".to_string(), serde_json::json!(attempts));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::InvalidStrategy("x".into()).code(), 11);
        assert_eq!(Error::NoValidRows { variable: "v".into() }.code(), 21);
        assert_eq!(
            Error::AttemptsExhausted {
                attempts: 3,
                detail: "d".into()
            }
            .code(),
            31
        );
        assert_eq!(Error::Usage("x".into()).code(), 41);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::InvalidStrategy("x".into()).category(), ErrorCategory::Config);
        assert_eq!(
            Error::NoValidRows { variable: "v".into() }.category(),
            ErrorCategory::Data
        );
        assert_eq!(Error::Degeneracy("x".into()).category(), ErrorCategory::Estimation);
        assert_eq!(
            Error::InvalidState {
                expected: "initialized".into(),
                actual: "created".into()
            }
            .category(),
            ErrorCategory::Usage
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::Degeneracy("x".into()).is_recoverable());
        assert!(!Error::DataFormat {
            variable: "v".into(),
            message: "m".into()
        }
        .is_recoverable());
        assert!(!Error::Usage("x".into()).is_recoverable());
    }

    #[test]
    fn test_from_diagnostics_uses_first_kind() {
        let mut list = Diagnostics::new();
        list.push(Diagnostic::model_mismatch("nModality: 2 but value 3 observed").for_variable("c"));
        list.push(Diagnostic::degeneracy("empty class"));
        let err = Error::from_diagnostics(&list);
        assert_eq!(err.code(), 12);
        let text = err.to_string();
        assert!(text.contains("variable 'c'"));
        assert!(text.contains("empty class"));
    }

    #[test]
    fn test_from_diagnostics_reports_empty_column() {
        let mut list = Diagnostics::new();
        list.push(Diagnostic::data_format("\"abc\" is not a valid format").for_individual(0));
        list.push(Diagnostic::empty_column("no valid individual in column").for_variable("age"));
        let err = Error::from_diagnostics(&list);
        assert_eq!(err.code(), 21);
        assert_eq!(err.to_string(), "variable 'age' has no valid individual");
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::UnknownModel {
            variable: "curve".into(),
            model: "Func_CS".into(),
        };
        let structured = StructuredError::from(&err).with_context("nb_cluster", 3);
        let json = structured.to_json();
        assert!(json.contains("\"code\":13"));
        assert!(json.contains("\"category\":\"config\""));
        assert!(json.contains("Func_CS"));
        assert!(json.contains("nb_cluster"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Estimation.to_string(), "estimation");
        assert_eq!(ErrorCategory::Io.to_string(), "io");
    }
}
