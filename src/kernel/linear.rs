//! Linear kernel implementation

use crate::core::Result;
use crate::kernel::{DivergenceKernel, KernelGroup, Projection};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Linear kernel: K = d
///
/// Uses the estimate itself as the similarity, which is appropriate when
/// the estimator produces inner products between densities rather than
/// distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl DivergenceKernel for LinearKernel {
    fn transform(&self, divergence: f64) -> f64 {
        divergence
    }

    fn name(&self) -> String {
        "linear".to_string()
    }
}

/// Single-candidate group holding the linear kernel
#[derive(Debug, Clone, Default)]
pub struct LinearKernelGroup {
    projection: Projection,
}

impl LinearKernelGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

impl KernelGroup for LinearKernelGroup {
    type Kernel = LinearKernel;

    fn kernels(&self, _train_divergences: &DMatrix<f64>) -> Result<Vec<LinearKernel>> {
        Ok(vec![LinearKernel])
    }

    fn projection(&self) -> Projection {
        self.projection
    }
}
