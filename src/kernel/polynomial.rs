//! Polynomial Kernel Implementation
//!
//! The polynomial kernel over divergence estimates is defined as:
//! K = (γ * d + r)^p
//!
//! Where:
//! - γ (gamma): scaling factor for the estimate
//! - r (coef0): independent term in the polynomial
//! - p (degree): degree of the polynomial
//!
//! Like [`LinearKernel`](crate::kernel::LinearKernel), this is meant for
//! estimators that return inner products between densities.

use crate::core::{Result, SDMError};
use crate::kernel::{DivergenceKernel, KernelGroup, Projection};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolynomialKernel {
    /// Scaling factor for the estimate (default: 1.0)
    pub gamma: f64,
    /// Independent term in the polynomial (default: 1.0)
    pub coef0: f64,
    /// Degree of the polynomial (default: 3)
    pub degree: u32,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel with the specified parameters
    ///
    /// # Examples
    /// ```
    /// use rsdm::kernel::{DivergenceKernel, PolynomialKernel};
    ///
    /// // Quadratic kernel: (d + 1)²
    /// let kernel = PolynomialKernel::new(2, 1.0, 1.0);
    /// assert_eq!(kernel.transform(1.0), 4.0);
    /// ```
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Self {
        assert!(degree > 0, "Polynomial degree must be positive");
        assert!(gamma > 0.0, "Gamma must be positive");

        Self {
            gamma,
            coef0,
            degree,
        }
    }
}

impl Default for PolynomialKernel {
    fn default() -> Self {
        Self::new(3, 1.0, 1.0)
    }
}

impl DivergenceKernel for PolynomialKernel {
    fn transform(&self, divergence: f64) -> f64 {
        (self.gamma * divergence + self.coef0).powi(self.degree as i32)
    }

    fn name(&self) -> String {
        format!(
            "polynomial(degree={}, gamma={}, coef0={})",
            self.degree, self.gamma, self.coef0
        )
    }
}

/// Candidate polynomial kernels, one per degree
#[derive(Debug, Clone)]
pub struct PolynomialKernelGroup {
    degrees: Vec<u32>,
    gamma: f64,
    coef0: f64,
    projection: Projection,
}

impl PolynomialKernelGroup {
    pub fn new(degrees: Vec<u32>, gamma: f64, coef0: f64) -> Self {
        Self {
            degrees,
            gamma,
            coef0,
            projection: Projection::Psd,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

impl KernelGroup for PolynomialKernelGroup {
    type Kernel = PolynomialKernel;

    fn kernels(&self, _train_divergences: &DMatrix<f64>) -> Result<Vec<PolynomialKernel>> {
        if self.degrees.is_empty() {
            return Err(SDMError::InvalidInput(
                "Polynomial kernel group needs at least one degree".to_string(),
            ));
        }
        if self.degrees.contains(&0) || self.gamma <= 0.0 {
            return Err(SDMError::InvalidInput(format!(
                "Invalid polynomial parameters: degrees {:?}, gamma {}",
                self.degrees, self.gamma
            )));
        }
        Ok(self
            .degrees
            .iter()
            .map(|&degree| PolynomialKernel::new(degree, self.gamma, self.coef0))
            .collect())
    }

    fn projection(&self) -> Projection {
        self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_polynomial_kernel_values() {
        let kernel = PolynomialKernel::new(2, 0.5, 1.0);
        // (0.5 * 2 + 1)^2 = 4
        assert_relative_eq!(kernel.transform(2.0), 4.0);
        // (0.5 * -2 + 1)^2 = 0
        assert_relative_eq!(kernel.transform(-2.0), 0.0);
    }

    #[test]
    fn test_polynomial_default() {
        let kernel = PolynomialKernel::default();
        assert_eq!(kernel.degree, 3);
        assert_relative_eq!(kernel.transform(1.0), 8.0);
    }

    #[test]
    fn test_group_candidates_follow_degree_order() {
        let group = PolynomialKernelGroup::new(vec![3, 1, 2], 1.0, 0.0);
        let kernels = group.kernels(&DMatrix::zeros(2, 2)).unwrap();
        let degrees: Vec<u32> = kernels.iter().map(|k| k.degree).collect();
        assert_eq!(degrees, vec![3, 1, 2]);
    }

    #[test]
    fn test_group_rejects_empty_or_zero_degree() {
        let empty = PolynomialKernelGroup::new(vec![], 1.0, 0.0);
        assert!(empty.kernels(&DMatrix::zeros(1, 1)).is_err());

        let zero = PolynomialKernelGroup::new(vec![0], 1.0, 0.0);
        assert!(zero.kernels(&DMatrix::zeros(1, 1)).is_err());
    }

    #[test]
    #[should_panic(expected = "Polynomial degree must be positive")]
    fn test_invalid_degree() {
        PolynomialKernel::new(0, 1.0, 1.0);
    }

    #[test]
    fn test_name_includes_parameters() {
        let kernel = PolynomialKernel::new(2, 1.0, 0.5);
        assert_eq!(kernel.name(), "polynomial(degree=2, gamma=1, coef0=0.5)");
    }
}
