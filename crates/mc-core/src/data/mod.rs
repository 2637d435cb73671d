//! Augmented data: observed values, missing-value encodings and imputation.

pub mod augmented;
pub mod parse;

pub use augmented::{AugmentedData, DataRange, Imputable, MisKind, MisVal};
pub use parse::{parse_cell, parse_column, CellError, CellValue, ParsedColumn};
