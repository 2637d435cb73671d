//! Structured diagnostics.
//!
//! Every stage of an estimation run (data parsing, model setup, sampling,
//! parameter re-estimation) reports problems as [`Diagnostic`] values that are
//! collected in a [`Diagnostics`] list. Callers collect many and decide once:
//! a non-empty list at a checkpoint stops the current attempt or phase.
//!
//! ```text
//! [degeneracy] variable 'color': modality 3 is absent from class 1
//! [data_format] variable 'age', individual 12: "[3:" is not a valid format
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of problem reported by a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A cell could not be parsed, or uses an encoding the model rejects.
    DataFormat,
    /// Not a single cell of a variable is usable.
    EmptyColumn,
    /// A declared parameter space disagrees with the data.
    ModelMismatch,
    /// A class or a per-class statistic makes the likelihood ill-defined.
    Degeneracy,
    /// An inner optimiser of a variable model failed.
    Optimizer,
    /// An operation was invoked in the wrong composer state.
    Usage,
}

impl DiagnosticKind {
    /// Whether the bounded retry policy may recover from this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiagnosticKind::Degeneracy | DiagnosticKind::Optimizer)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::DataFormat => write!(f, "data_format"),
            DiagnosticKind::EmptyColumn => write!(f, "empty_column"),
            DiagnosticKind::ModelMismatch => write!(f, "model_mismatch"),
            DiagnosticKind::Degeneracy => write!(f, "degeneracy"),
            DiagnosticKind::Optimizer => write!(f, "optimizer"),
            DiagnosticKind::Usage => write!(f, "usage"),
        }
    }
}

/// A single structured problem report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Variable identifier, `None` for composer-level problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Individual index, when the problem concerns a single row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            variable: None,
            individual: None,
            message: message.into(),
        }
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::DataFormat, message)
    }

    pub fn empty_column(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::EmptyColumn, message)
    }

    pub fn model_mismatch(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::ModelMismatch, message)
    }

    pub fn degeneracy(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Degeneracy, message)
    }

    pub fn optimizer(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Optimizer, message)
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Usage, message)
    }

    /// Attach the variable the diagnostic belongs to.
    pub fn for_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Attach the individual the diagnostic belongs to.
    pub fn for_individual(mut self, individual: usize) -> Self {
        self.individual = Some(individual);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        match (&self.variable, self.individual) {
            (Some(v), Some(i)) => write!(f, " variable '{}', individual {}:", v, i)?,
            (Some(v), None) => write!(f, " variable '{}':", v)?,
            (None, Some(i)) => write!(f, " individual {}:", i)?,
            (None, None) => {}
        }
        write!(f, " {}", self.message)
    }
}

/// Ordered accumulator of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append every diagnostic of `other`, preserving order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Number of diagnostics of the given kind.
    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.0.iter().filter(|d| d.kind == kind).count()
    }

    /// Whether any diagnostic has the given kind.
    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }

    /// Set the variable on every diagnostic that does not carry one yet.
    pub fn for_variable(mut self, variable: &str) -> Self {
        for d in &mut self.0 {
            if d.variable.is_none() {
                d.variable = Some(variable.to_string());
            }
        }
        self
    }

    /// `Ok(())` when empty, the accumulated list otherwise.
    pub fn into_result(self) -> std::result::Result<(), Diagnostics> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(d: Diagnostic) -> Self {
        Self(vec![d])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, d) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}
