//! SVM solver implementations
//!
//! The binary solver is a Sequential Minimal Optimization (SMO) C-SVC
//! working directly on a precomputed kernel matrix, with second-order
//! working-set selection as described in "Working Set Selection Using
//! Second Order Information for Training SVM" by Fan, Chen and Lin.
//! Multiclass problems are reduced one-vs-one.

pub mod multiclass;
pub mod probability;
pub mod smo;

pub use self::multiclass::*;
pub use self::smo::*;
