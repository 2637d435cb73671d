//! Running estimators over sampling iterations.

pub mod imputation;
pub mod running;

pub use imputation::{ImputationStatistic, ImputedValue, PointEstimate};
pub use running::RunningStatistic;
