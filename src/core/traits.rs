//! Capability traits at the seams of the SDM pipeline

use crate::core::{Group, Prediction, Result, SolverConfig};
use nalgebra::DMatrix;

/// Estimates a statistical divergence between two groups of samples
///
/// Estimates may be asymmetric and noisy (even negative); the kernel
/// pipeline symmetrizes and projects the results as configured.
pub trait DivergenceEstimator: Send + Sync {
    /// Divergence from group `a` to group `b`
    fn divergence(&self, a: &Group, b: &Group) -> Result<f64>;

    /// Divergence matrix of shape `groups_a.len() x groups_b.len()`
    fn estimate(&self, groups_a: &[Group], groups_b: &[Group]) -> Result<DMatrix<f64>> {
        let mut out = DMatrix::zeros(groups_a.len(), groups_b.len());
        for (i, a) in groups_a.iter().enumerate() {
            for (j, b) in groups_b.iter().enumerate() {
                out[(i, j)] = self.divergence(a, b)?;
            }
        }
        Ok(out)
    }
}

/// Support vector solver working on precomputed kernel matrices
pub trait SvmSolver: Send + Sync {
    type Model: SolverModel;

    /// Fit on an `n x n` kernel matrix with one label per row
    fn fit(&self, kernel: &DMatrix<f64>, labels: &[i32], c: f64) -> Result<Self::Model>;

    /// Solver configuration (C is overridden per fit)
    fn config(&self) -> &SolverConfig;
}

/// A fitted solver; dropping it releases its state
pub trait SolverModel: Send + Sync {
    /// Predict from the kernel values between one test item and every
    /// training item, in training order
    fn predict_one(&self, kernel_row: &[f64]) -> Prediction;

    /// Class labels in the internal (first-seen) order
    fn classes(&self) -> &[i32];

    /// Number of training items with a non-zero coefficient
    fn n_support_vectors(&self) -> usize;
}
