//! Gaussian kernel over divergences
//!
//! K = exp(-d² / (2σ²)), where d is the (symmetrized) divergence between
//! two groups and σ is the bandwidth. Self-similarity is 1.

use crate::core::{Result, SDMError};
use crate::kernel::{DivergenceKernel, KernelGroup, Projection};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Gaussian kernel with bandwidth σ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianKernel {
    sigma: f64,
}

impl GaussianKernel {
    /// Create a Gaussian kernel
    ///
    /// # Panics
    /// Panics if sigma is not positive and finite
    pub fn new(sigma: f64) -> Self {
        assert!(
            sigma > 0.0 && sigma.is_finite(),
            "Sigma must be positive, got: {}",
            sigma
        );
        Self { sigma }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl DivergenceKernel for GaussianKernel {
    fn transform(&self, divergence: f64) -> f64 {
        (-divergence * divergence / (2.0 * self.sigma * self.sigma)).exp()
    }

    fn name(&self) -> String {
        format!("gaussian(sigma={})", self.sigma)
    }
}

/// Candidate Gaussian kernels, one per bandwidth
///
/// With `scale_sigma`, each bandwidth is taken relative to the median
/// off-diagonal training divergence.
#[derive(Debug, Clone)]
pub struct GaussianKernelGroup {
    sigmas: Vec<f64>,
    scale_sigma: bool,
    symmetrize: bool,
    projection: Projection,
}

impl GaussianKernelGroup {
    pub fn new(sigmas: Vec<f64>, scale_sigma: bool) -> Self {
        Self {
            sigmas,
            scale_sigma,
            symmetrize: true,
            projection: Projection::Psd,
        }
    }

    /// Use estimates as given instead of averaging both directions
    pub fn without_symmetrization(mut self) -> Self {
        self.symmetrize = false;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }
}

/// Median of the off-diagonal entries of a square matrix
pub(crate) fn median_off_diagonal(divergences: &DMatrix<f64>) -> Option<f64> {
    let (rows, cols) = divergences.shape();
    let mut values: Vec<f64> = (0..rows)
        .flat_map(|i| {
            (0..cols)
                .filter(move |&j| j != i)
                .map(move |j| divergences[(i, j)])
        })
        .filter(|v| v.is_finite())
        .collect();

    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    })
}

impl KernelGroup for GaussianKernelGroup {
    type Kernel = GaussianKernel;

    fn kernels(&self, train_divergences: &DMatrix<f64>) -> Result<Vec<GaussianKernel>> {
        if self.sigmas.is_empty() {
            return Err(SDMError::InvalidInput(
                "Gaussian kernel group needs at least one sigma".to_string(),
            ));
        }

        let scale = if self.scale_sigma {
            let median = median_off_diagonal(train_divergences).ok_or_else(|| {
                SDMError::InvalidInput(
                    "Sigma scaling needs at least two training groups".to_string(),
                )
            })?;
            if median <= 0.0 {
                return Err(SDMError::Numerical(format!(
                    "Cannot scale sigma by non-positive median divergence {}",
                    median
                )));
            }
            median
        } else {
            1.0
        };

        self.sigmas
            .iter()
            .map(|&sigma| {
                let scaled = sigma * scale;
                if scaled > 0.0 && scaled.is_finite() {
                    Ok(GaussianKernel::new(scaled))
                } else {
                    Err(SDMError::InvalidInput(format!(
                        "Sigma must be positive, got: {}",
                        scaled
                    )))
                }
            })
            .collect()
    }

    fn symmetrize_divergences(&self) -> bool {
        self.symmetrize
    }

    fn projection(&self) -> Projection {
        self.projection
    }
}
