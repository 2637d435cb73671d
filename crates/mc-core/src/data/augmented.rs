//! Partially observed columns and their stochastic completion.

use crate::rng::McRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value types that can be imputed.
pub trait Imputable:
    Copy
    + PartialOrd
    + Default
    + fmt::Debug
    + fmt::Display
    + std::ops::Sub<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Uniform draw on `[lo, hi]`; returns `lo` when the interval is empty.
    fn uniform_between(lo: Self, hi: Self, rng: &mut McRng) -> Self;

    /// Lossy conversion used for exports.
    fn to_f64(self) -> f64;
}

impl Imputable for f64 {
    /// Convex combination of the bounds, finite even when `hi - lo` is not.
    fn uniform_between(lo: Self, hi: Self, rng: &mut McRng) -> Self {
        if lo < hi {
            let u: f64 = rng.random();
            (lo * (1.0 - u) + hi * u).clamp(lo, hi)
        } else {
            lo
        }
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl Imputable for i64 {
    fn uniform_between(lo: Self, hi: Self, rng: &mut McRng) -> Self {
        if lo < hi {
            rng.random_range(lo..=hi)
        } else {
            lo
        }
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Observation status of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisVal<T> {
    /// Observed value.
    Present,
    /// Nothing known.
    Missing,
    /// One of the listed values.
    FiniteValues(Vec<T>),
    /// Somewhere in `[lo, hi]`.
    Interval(T, T),
    /// At most `hi`.
    LowerUnbounded(T),
    /// At least `lo`.
    UpperUnbounded(T),
}

impl<T> MisVal<T> {
    pub fn kind(&self) -> MisKind {
        match self {
            MisVal::Present => MisKind::Present,
            MisVal::Missing => MisKind::Missing,
            MisVal::FiniteValues(_) => MisKind::FiniteValues,
            MisVal::Interval(..) => MisKind::Interval,
            MisVal::LowerUnbounded(_) => MisKind::LowerUnbounded,
            MisVal::UpperUnbounded(_) => MisKind::UpperUnbounded,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, MisVal::Present)
    }
}

/// Discriminant of [`MisVal`], used to declare what a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisKind {
    Present,
    Missing,
    FiniteValues,
    Interval,
    LowerUnbounded,
    UpperUnbounded,
}

impl MisKind {
    pub const ALL: &'static [MisKind] = &[
        MisKind::Present,
        MisKind::Missing,
        MisKind::FiniteValues,
        MisKind::Interval,
        MisKind::LowerUnbounded,
        MisKind::UpperUnbounded,
    ];
}

impl fmt::Display for MisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MisKind::Present => write!(f, "present"),
            MisKind::Missing => write!(f, "missing"),
            MisKind::FiniteValues => write!(f, "finite set"),
            MisKind::Interval => write!(f, "interval"),
            MisKind::LowerUnbounded => write!(f, "lower-unbounded interval"),
            MisKind::UpperUnbounded => write!(f, "upper-unbounded interval"),
        }
    }
}

/// Bounds of the values a column can take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: Imputable> DataRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    fn extend(range: Option<Self>, value: T) -> Option<Self> {
        Some(match range {
            None => Self::new(value, value),
            Some(r) => Self::new(
                if value < r.min { value } else { r.min },
                if value > r.max { value } else { r.max },
            ),
        })
    }
}

impl DataRange<i64> {
    /// Number of integer values in the range.
    pub fn cardinality(&self) -> usize {
        self.max.saturating_sub(self.min).saturating_add(1).max(0) as usize
    }
}

/// A column of values with per-individual missing-value information.
///
/// `data[i]` always holds a concrete value: observed when `mis_data[i]` is
/// [`MisVal::Present`], the latest imputation otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedData<T> {
    pub data: Vec<T>,
    pub mis_data: Vec<MisVal<T>>,
    range: Option<DataRange<T>>,
    range_pinned: bool,
}

impl<T: Imputable> Default for AugmentedData<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Imputable> AugmentedData<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            mis_data: Vec::new(),
            range: None,
            range_pinned: false,
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            data: Vec::with_capacity(n),
            mis_data: Vec::with_capacity(n),
            range: None,
            range_pinned: false,
        }
    }

    /// Fully observed column.
    pub fn from_present(values: Vec<T>) -> Self {
        let mis_data = vec![MisVal::Present; values.len()];
        let mut out = Self {
            data: values,
            mis_data,
            range: None,
            range_pinned: false,
        };
        out.compute_range();
        out
    }

    /// Append an individual. `value` is ignored unless `mis` is present.
    pub fn push(&mut self, value: T, mis: MisVal<T>) {
        let value = if mis.is_present() { value } else { T::default() };
        self.data.push(value);
        self.mis_data.push(mis);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_present(&self, i: usize) -> bool {
        self.mis_data[i].is_present()
    }

    pub fn nb_present(&self) -> usize {
        self.mis_data.iter().filter(|m| m.is_present()).count()
    }

    /// Number of individuals whose cell is of kind `kind`.
    pub fn count_kind(&self, kind: MisKind) -> usize {
        self.mis_data.iter().filter(|m| m.kind() == kind).count()
    }

    pub fn range(&self) -> Option<DataRange<T>> {
        self.range
    }

    pub fn is_range_pinned(&self) -> bool {
        self.range_pinned
    }

    /// Derive the range from observed values and missing-value bounds.
    ///
    /// Once the range is pinned this does nothing.
    pub fn compute_range(&mut self) {
        if self.range_pinned {
            return;
        }
        let mut range = None;
        for (value, mis) in self.data.iter().zip(self.mis_data.iter()) {
            match mis {
                MisVal::Present => range = DataRange::extend(range, *value),
                MisVal::Missing => {}
                MisVal::FiniteValues(values) => {
                    for v in values {
                        range = DataRange::extend(range, *v);
                    }
                }
                MisVal::Interval(lo, hi) => {
                    range = DataRange::extend(range, *lo);
                    range = DataRange::extend(range, *hi);
                }
                MisVal::LowerUnbounded(bound) | MisVal::UpperUnbounded(bound) => {
                    range = DataRange::extend(range, *bound);
                }
            }
        }
        self.range = range;
    }

    /// Fix the range to the model's parameter space. It is never re-derived.
    pub fn pin_range(&mut self, min: T, max: T) {
        self.range = Some(DataRange::new(min, max));
        self.range_pinned = true;
    }

    /// Redraw every non-present value.
    pub fn remove_missing(&mut self, rng: &mut McRng) {
        for i in 0..self.data.len() {
            self.remove_missing_individual(i, rng);
        }
    }

    /// Redraw the value of individual `i` uniformly within its constraint.
    ///
    /// A fully missing value with no known range keeps its current value.
    pub fn remove_missing_individual(&mut self, i: usize, rng: &mut McRng) {
        let range = self.range;
        let drawn = match &self.mis_data[i] {
            MisVal::Present => return,
            MisVal::Missing => match range {
                Some(r) => T::uniform_between(r.min, r.max, rng),
                None => return,
            },
            MisVal::FiniteValues(values) => {
                if values.is_empty() {
                    return;
                }
                values[rng.random_range(0..values.len())]
            }
            MisVal::Interval(lo, hi) => T::uniform_between(*lo, *hi, rng),
            MisVal::LowerUnbounded(hi) => match range {
                Some(r) if r.min < *hi => T::uniform_between(r.min, *hi, rng),
                _ => *hi,
            },
            MisVal::UpperUnbounded(lo) => match range {
                Some(r) if *lo < r.max => T::uniform_between(*lo, r.max, rng),
                _ => *lo,
            },
        };
        self.data[i] = drawn;
    }

    /// Whether `value` satisfies the constraint of individual `i`.
    pub fn admits(&self, i: usize, value: T) -> bool {
        match &self.mis_data[i] {
            MisVal::Present => self.data[i] == value,
            MisVal::Missing => true,
            MisVal::FiniteValues(values) => values.iter().any(|v| *v == value),
            MisVal::Interval(lo, hi) => *lo <= value && value <= *hi,
            MisVal::LowerUnbounded(hi) => value <= *hi,
            MisVal::UpperUnbounded(lo) => *lo <= value,
        }
    }

    /// Largest value referenced by the column, if any.
    pub fn max_value(&self) -> Option<T> {
        self.range.map(|r| r.max)
    }

    /// Smallest value referenced by the column, if any.
    pub fn min_value(&self) -> Option<T> {
        self.range.map(|r| r.min)
    }
}
