//! Kernel trait definitions

use crate::core::Result;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Kernel function over precomputed divergences
///
/// Maps the divergence between two groups to a similarity. The resulting
/// training matrix is only guaranteed to be a valid (PSD) kernel after
/// projection.
pub trait DivergenceKernel: Send + Sync + Clone + Debug {
    /// Similarity for one divergence value
    fn transform(&self, divergence: f64) -> f64;

    /// Short human-readable description including parameters
    fn name(&self) -> String;
}

/// How the training kernel matrix is repaired before it reaches the solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Clamp negative eigenvalues to zero
    #[default]
    Psd,
    /// Nearest unit-diagonal PSD matrix
    Covariance,
}

/// A family of candidate kernels searched during model selection
pub trait KernelGroup: Send + Sync {
    type Kernel: DivergenceKernel;

    /// Candidate kernels, in search order
    ///
    /// Receives the (already symmetrized, if configured) training
    /// divergences so that data-dependent parameters can be resolved.
    fn kernels(&self, train_divergences: &DMatrix<f64>) -> Result<Vec<Self::Kernel>>;

    /// Average divergence estimates in both directions before use
    fn symmetrize_divergences(&self) -> bool {
        true
    }

    fn projection(&self) -> Projection {
        Projection::Psd
    }
}
