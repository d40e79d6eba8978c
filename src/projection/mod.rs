//! Projection of noisy similarity matrices onto valid kernel matrices
//!
//! Kernel matrices built from estimated divergences are generally neither
//! exactly symmetric nor positive semi-definite. The functions here repair
//! them in place:
//!
//! - [`project_to_symmetric_psd`]: symmetrize, then clamp negative
//!   eigenvalues to zero (`M = Q max(Λ, 0) Qᵀ`).
//! - [`project_to_covariance`]: nearest unit-diagonal PSD matrix
//!   (correlation form), found by alternating projections between the PSD
//!   cone and the unit-diagonal affine set, with Dykstra's correction on the
//!   PSD step.

use crate::core::{Result, SDMError};
use log::debug;
use nalgebra::{DMatrix, SymmetricEigen};

/// Sweep limit handed to the symmetric eigensolver
const EIGEN_MAX_ITERATIONS: usize = 10_000;

/// Diagonal entries at or below this after PSD clamping have no usable
/// self-similarity
pub const DEGENERATE_DIAGONAL: f64 = 1e-12;

/// Replace `m` with `(m + mᵀ) / 2`
pub fn symmetrize(m: &mut DMatrix<f64>) {
    let n = m.nrows().min(m.ncols());
    for i in 0..n {
        for j in (i + 1)..n {
            let v = 0.5 * (m[(i, j)] + m[(j, i)]);
            m[(i, j)] = v;
            m[(j, i)] = v;
        }
    }
}

fn check_square(m: &DMatrix<f64>) -> Result<usize> {
    if m.nrows() != m.ncols() {
        return Err(SDMError::InvalidInput(format!(
            "Expected a square matrix, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }
    Ok(m.nrows())
}

fn check_finite(m: &DMatrix<f64>) -> Result<()> {
    if let Some(pos) = m.iter().position(|v| !v.is_finite()) {
        return Err(SDMError::Numerical(format!(
            "Non-finite matrix entry at ({}, {})",
            pos % m.nrows(),
            pos / m.nrows()
        )));
    }
    Ok(())
}

fn decompose(m: DMatrix<f64>) -> Result<SymmetricEigen<f64, nalgebra::Dyn>> {
    SymmetricEigen::try_new(m, f64::EPSILON, EIGEN_MAX_ITERATIONS).ok_or_else(|| {
        SDMError::Numerical("Symmetric eigendecomposition did not converge".to_string())
    })
}

/// Rebuild a symmetric matrix with every negative eigenvalue set to zero
fn clamp_eigenvalues(m: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let eigen = decompose(m)?;
    let clamped = eigen.eigenvalues.map(|lambda| lambda.max(0.0));
    let q = &eigen.eigenvectors;
    let mut out = q * DMatrix::from_diagonal(&clamped) * q.transpose();
    symmetrize(&mut out);
    Ok(out)
}

/// Project a square matrix onto the nearest symmetric PSD matrix, in place
///
/// Already-PSD input is a fixed point up to roundoff.
pub fn project_to_symmetric_psd(m: &mut DMatrix<f64>) -> Result<()> {
    let n = check_square(m)?;
    if n == 0 {
        return Ok(());
    }
    check_finite(m)?;

    symmetrize(m);
    *m = clamp_eigenvalues(m.clone())?;
    Ok(())
}

/// Project a square matrix onto a unit-diagonal PSD matrix with default
/// settings, in place
pub fn project_to_covariance(m: &mut DMatrix<f64>) -> Result<()> {
    CovarianceProjection::default().project(m)
}

/// Smallest eigenvalue of the symmetric part of `m`
pub fn min_eigenvalue(m: &DMatrix<f64>) -> Result<f64> {
    let n = check_square(m)?;
    if n == 0 {
        return Ok(0.0);
    }
    check_finite(m)?;

    let mut sym = m.clone();
    symmetrize(&mut sym);
    let eigen = decompose(sym)?;
    Ok(eigen.eigenvalues.min())
}

/// Settings for the unit-diagonal (correlation form) projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceProjection {
    /// Stop once no entry moves by more than this between iterations
    pub tolerance: f64,
    /// Alternating-projection rounds before giving up
    pub max_iterations: usize,
}

impl Default for CovarianceProjection {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
        }
    }
}

impl CovarianceProjection {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Replace `m` with the nearest symmetric PSD matrix whose diagonal is
    /// exactly one
    pub fn project(&self, m: &mut DMatrix<f64>) -> Result<()> {
        let n = check_square(m)?;
        if n == 0 {
            return Ok(());
        }
        check_finite(m)?;
        symmetrize(m);

        let mut y = m.clone();
        let mut correction = DMatrix::<f64>::zeros(n, n);

        for iteration in 0..self.max_iterations {
            let r = &y - &correction;
            let x = clamp_eigenvalues(r.clone())?;

            if iteration == 0 {
                if let Some(i) = (0..n).find(|&i| x[(i, i)] <= DEGENERATE_DIAGONAL) {
                    return Err(SDMError::Numerical(format!(
                        "Degenerate self-similarity at index {}: diagonal {:.3e} after PSD projection",
                        i,
                        x[(i, i)]
                    )));
                }
            }

            correction = &x - &r;
            let mut next = x;
            next.fill_diagonal(1.0);

            let change = (&next - &y).amax();
            y = next;

            if change < self.tolerance {
                debug!(
                    "Covariance projection converged after {} iterations",
                    iteration + 1
                );
                symmetrize(&mut y);
                *m = y;
                return Ok(());
            }
        }

        Err(SDMError::Numerical(format!(
            "Covariance projection did not converge within {} iterations",
            self.max_iterations
        )))
    }
}
