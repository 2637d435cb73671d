//! Mixture composer common types.
//!
//! This crate provides foundational types shared by the estimation crates:
//! - The unified error type with stable codes
//! - Structured diagnostics and their accumulator
//! - The run mode (learning or prediction)

pub mod diagnostic;
pub mod error;
pub mod mode;

pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use mode::RunMode;

/// Offset between the external (1-based) and internal (0-based) encoding of
/// class labels and categorical modalities.
pub const MIN_MODALITY: i64 = 1;
