//! Divergence estimators between groups of samples
//!
//! The SDM pipeline only depends on the [`DivergenceEstimator`] trait;
//! any estimator can be plugged in. A parametric baseline is provided.

pub mod gaussian;

pub use self::gaussian::*;
pub use crate::core::DivergenceEstimator;
