//! Kernel functions over divergence matrices
//!
//! A kernel group turns one divergence matrix into a family of candidate
//! kernel matrices. Training matrices are projected so the solver always
//! sees a valid kernel; test rows are plain kernel evaluations against the
//! fixed training groups.

pub mod gaussian;
pub mod linear;
pub mod polynomial;
pub mod traits;

pub use self::gaussian::*;
pub use self::linear::*;
pub use self::polynomial::*;
pub use self::traits::*;

use crate::core::{Result, SDMError};
use crate::projection::{project_to_covariance, project_to_symmetric_psd, symmetrize};
use nalgebra::DMatrix;

/// Symmetrize a square training divergence matrix if requested
pub fn prepare_divergences(
    mut divergences: DMatrix<f64>,
    symmetrize_divs: bool,
) -> Result<DMatrix<f64>> {
    if !divergences.is_square() {
        return Err(SDMError::InvalidInput(format!(
            "Training divergences must be square, got {}x{}",
            divergences.nrows(),
            divergences.ncols()
        )));
    }
    if symmetrize_divs {
        symmetrize(&mut divergences);
    }
    Ok(divergences)
}

/// Apply a kernel elementwise without any projection
pub fn kernel_rows<K: DivergenceKernel>(kernel: &K, divergences: &DMatrix<f64>) -> DMatrix<f64> {
    divergences.map(|d| kernel.transform(d))
}

/// Build the projected training kernel matrix for one candidate kernel
pub fn gram_matrix<K: DivergenceKernel>(
    kernel: &K,
    divergences: &DMatrix<f64>,
    projection: Projection,
) -> Result<DMatrix<f64>> {
    let mut gram = kernel_rows(kernel, divergences);
    match projection {
        Projection::Psd => project_to_symmetric_psd(&mut gram)?,
        Projection::Covariance => project_to_covariance(&mut gram)?,
    }
    Ok(gram)
}
