//! Core math modules.

pub mod categorical;
pub mod quantile;
pub mod stable;
