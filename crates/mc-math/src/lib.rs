//! Mixture composer math utilities.

pub mod math;

pub use math::categorical::*;
pub use math::quantile::*;
pub use math::stable::*;
