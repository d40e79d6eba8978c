//! Rust implementation of Support Distribution Machines (SDM)
//!
//! Classifies groups of samples by the distributions they were drawn
//! from. Pairwise divergences between groups are turned into kernel
//! values, projected onto valid kernel matrices, and fed to a C-SVC
//! whose kernel and regularization parameter are chosen by
//! cross-validation.
//!
//! Based on "Nonparametric Kernel Estimators for Image Classification" by
//! Póczos, Xiong, Sutherland and Schneider.

pub mod api;
pub mod core;
pub mod data;
pub mod divergence;
pub mod kernel;
pub mod persistence;
pub mod projection;
pub mod selection;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{ModelInfo, TrainedSDM, SDM};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::GroupDataset;
pub use crate::divergence::GaussianL2Divergence;
pub use crate::kernel::{DivergenceKernel, GaussianKernel, GaussianKernelGroup, KernelGroup};
pub use crate::projection::{project_to_covariance, project_to_symmetric_psd};
pub use crate::selection::{ModelSelector, Selection, SelectionConfig};
pub use crate::solver::{OneVsOneModel, OneVsOneSvm};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
