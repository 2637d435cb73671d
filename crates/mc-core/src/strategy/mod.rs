//! Estimation strategies driving a [`MixtureComposer`](crate::composer::MixtureComposer).

pub mod gibbs;
pub mod sem;

pub use gibbs::GibbsStrategy;
pub use sem::{SemReport, SemStrategy};
