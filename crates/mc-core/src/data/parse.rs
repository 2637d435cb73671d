//! Cell grammar for raw columns.
//!
//! | cell              | meaning                          |
//! |-------------------|----------------------------------|
//! | `3.2`             | present                          |
//! | empty or `?`      | missing                          |
//! | `[lo:hi]`         | interval                         |
//! | `[lo:]`, `[lo:+inf]` | upper-unbounded from `lo`     |
//! | `[:hi]`, `[-inf:hi]` | lower-unbounded up to `hi`    |
//! | `{a,b,c}` or `a,b,c` | one of a finite set           |
//!
//! Integer columns may be shifted: categorical modalities and class labels
//! are numbered from 1 externally and from 0 internally.

use super::augmented::{AugmentedData, Imputable, MisKind, MisVal};
use mc_common::{Diagnostic, Diagnostics};
use once_cell::sync::Lazy;
use regex::Regex;

static INTERVAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*([^:\]]*?)\s*:\s*([^:\]]*?)\s*\]$").expect("interval pattern"));
static FINITE_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\s*(.*?)\s*\}$").expect("finite set pattern"));

/// Values that can be read from a cell.
pub trait CellValue: Imputable {
    fn parse_token(token: &str) -> Option<Self>;

    /// `self - shift`, `None` when it does not fit.
    fn unshift(self, shift: Self) -> Option<Self>;
}

impl CellValue for f64 {
    fn parse_token(token: &str) -> Option<Self> {
        token.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn unshift(self, shift: Self) -> Option<Self> {
        Some(self - shift).filter(|v| v.is_finite())
    }
}

impl CellValue for i64 {
    fn parse_token(token: &str) -> Option<Self> {
        token.parse::<i64>().ok()
    }

    fn unshift(self, shift: Self) -> Option<Self> {
        self.checked_sub(shift)
    }
}

fn read_value<T: CellValue>(token: &str, shift: T) -> Option<T> {
    T::parse_token(token).and_then(|v| v.unshift(shift))
}

/// Why a cell was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    /// The cell matches no encoding.
    Malformed,
    /// An interval whose lower bound exceeds its upper bound.
    EmptyInterval,
}

/// Parse one cell. Returned values are already shifted by `shift`.
pub fn parse_cell<T: CellValue>(cell: &str, shift: T) -> Result<(T, MisVal<T>), CellError> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "?" {
        return Ok((T::default(), MisVal::Missing));
    }

    if let Some(caps) = INTERVAL.captures(cell) {
        let lo = parse_bound::<T>(&caps[1], shift)?;
        let hi = parse_bound::<T>(&caps[2], shift)?;
        return match (lo, hi) {
            (None, None) => Ok((T::default(), MisVal::Missing)),
            (Some(lo), None) => Ok((T::default(), MisVal::UpperUnbounded(lo))),
            (None, Some(hi)) => Ok((T::default(), MisVal::LowerUnbounded(hi))),
            (Some(lo), Some(hi)) if lo > hi => Err(CellError::EmptyInterval),
            (Some(lo), Some(hi)) => Ok((T::default(), MisVal::Interval(lo, hi))),
        };
    }

    let list = match FINITE_SET.captures(cell) {
        Some(caps) => Some(caps[1].to_string()),
        None if cell.contains(',') => Some(cell.to_string()),
        None => None,
    };
    if let Some(list) = list {
        let mut values = Vec::new();
        for token in list.split(',') {
            let v = read_value(token.trim(), shift).ok_or(CellError::Malformed)?;
            if !values.contains(&v) {
                values.push(v);
            }
        }
        if values.is_empty() {
            return Err(CellError::Malformed);
        }
        return Ok((T::default(), MisVal::FiniteValues(values)));
    }

    read_value(cell, shift)
        .map(|v| (v, MisVal::Present))
        .ok_or(CellError::Malformed)
}

/// `None` for an open bound (empty, `-inf`, `+inf`, `inf`).
fn parse_bound<T: CellValue>(token: &str, shift: T) -> Result<Option<T>, CellError> {
    match token {
        "" | "-inf" | "+inf" | "inf" => Ok(None),
        _ => read_value(token, shift).map(Some).ok_or(CellError::Malformed),
    }
}

/// A parsed column and the per-individual problems met on the way.
#[derive(Debug, Clone)]
pub struct ParsedColumn<T> {
    pub data: AugmentedData<T>,
    /// Cells that were rejected and replaced by a plain missing value.
    pub warnings: Diagnostics,
}

/// Parse a raw column.
///
/// A malformed cell, or a cell whose kind is not in `accepted`, yields a
/// diagnostic for that individual and is treated as missing; the other
/// individuals are still processed. A column with no valid cell at all is an
/// error carrying every diagnostic.
pub fn parse_column<T: CellValue>(
    id: &str,
    cells: &[String],
    shift: T,
    accepted: &[MisKind],
) -> Result<ParsedColumn<T>, Diagnostics> {
    let mut data = AugmentedData::with_capacity(cells.len());
    let mut warnings = Diagnostics::new();
    let mut nb_valid = 0usize;

    for (i, cell) in cells.iter().enumerate() {
        match parse_cell::<T>(cell, shift) {
            Ok((value, mis)) if accepted.contains(&mis.kind()) => {
                nb_valid += 1;
                data.push(value, mis);
            }
            Ok((_, mis)) => {
                warnings.push(
                    Diagnostic::data_format(format!(
                        "{:?}: {} values are not supported by this model",
                        cell,
                        mis.kind()
                    ))
                    .for_variable(id)
                    .for_individual(i),
                );
                data.push(T::default(), MisVal::Missing);
            }
            Err(CellError::EmptyInterval) => {
                warnings.push(
                    Diagnostic::data_format(format!("{:?}: interval lower bound exceeds upper bound", cell))
                        .for_variable(id)
                        .for_individual(i),
                );
                data.push(T::default(), MisVal::Missing);
            }
            Err(CellError::Malformed) => {
                warnings.push(
                    Diagnostic::data_format(format!("{:?} is not a valid format", cell))
                        .for_variable(id)
                        .for_individual(i),
                );
                data.push(T::default(), MisVal::Missing);
            }
        }
    }

    if nb_valid == 0 {
        warnings.push(Diagnostic::empty_column("no valid individual in column").for_variable(id));
        return Err(warnings);
    }

    data.compute_range();
    Ok(ParsedColumn { data, warnings })
}
