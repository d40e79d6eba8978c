//! Parametric L2 divergence between Gaussian fits
//!
//! Each group is summarised by a Gaussian with diagonal covariance
//! (per-coordinate sample mean and unbiased variance). The L2 distance
//! between two such densities has a closed form:
//!
//! ```text
//! L2(p, q)² = ∫p² + ∫q² - 2∫pq
//! ∫ N(x; μa, Σa) N(x; μb, Σb) dx = N(μa; μb, Σa + Σb)
//! ```

use crate::core::{DivergenceEstimator, Group, Result, SDMError};
use std::f64::consts::PI;

/// Diagonal Gaussian summary of a group
#[derive(Debug, Clone, PartialEq)]
struct DiagonalGaussian {
    mean: Vec<f64>,
    variance: Vec<f64>,
}

impl DiagonalGaussian {
    fn fit(group: &Group, min_variance: f64) -> Self {
        let n = group.len() as f64;
        let mut mean = Vec::with_capacity(group.dim());
        let mut variance = Vec::with_capacity(group.dim());

        for d in 0..group.dim() {
            let m = group.column(d).sum::<f64>() / n;
            let var = if group.len() > 1 {
                group.column(d).map(|x| (x - m) * (x - m)).sum::<f64>() / (n - 1.0)
            } else {
                0.0
            };
            mean.push(m);
            variance.push(var.max(min_variance));
        }

        Self { mean, variance }
    }

    /// ∫ p(x) q(x) dx for two diagonal Gaussians
    fn overlap(&self, other: &Self) -> f64 {
        self.mean
            .iter()
            .zip(&self.variance)
            .zip(other.mean.iter().zip(&other.variance))
            .map(|((&ma, &va), (&mb, &vb))| {
                let s = va + vb;
                let diff = ma - mb;
                (-diff * diff / (2.0 * s)).exp() / (2.0 * PI * s).sqrt()
            })
            .product()
    }
}

/// L2 distance between diagonal Gaussian fits of two groups
///
/// Symmetric and non-negative; zero for groups with identical fits.
#[derive(Debug, Clone, Copy)]
pub struct GaussianL2Divergence {
    min_variance: f64,
}

impl GaussianL2Divergence {
    pub fn new() -> Self {
        Self { min_variance: 1e-6 }
    }

    /// Floor applied to every fitted variance
    ///
    /// # Panics
    /// Panics if min_variance is not positive
    pub fn with_min_variance(min_variance: f64) -> Self {
        assert!(
            min_variance > 0.0,
            "Variance floor must be positive, got: {}",
            min_variance
        );
        Self { min_variance }
    }

    pub fn min_variance(&self) -> f64 {
        self.min_variance
    }
}

impl Default for GaussianL2Divergence {
    fn default() -> Self {
        Self::new()
    }
}

impl DivergenceEstimator for GaussianL2Divergence {
    fn divergence(&self, a: &Group, b: &Group) -> Result<f64> {
        if a.dim() != b.dim() {
            return Err(SDMError::DimensionMismatch {
                expected: a.dim(),
                actual: b.dim(),
            });
        }

        let p = DiagonalGaussian::fit(a, self.min_variance);
        let q = DiagonalGaussian::fit(b, self.min_variance);
        let squared = p.overlap(&p) + q.overlap(&q) - 2.0 * p.overlap(&q);

        Ok(squared.max(0.0).sqrt())
    }
}
