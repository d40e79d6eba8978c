//! High-level API for Support Distribution Machine operations
//!
//! An SDM classifies whole groups of samples. Training estimates the
//! divergence between every pair of training groups, picks a kernel and a
//! regularization parameter by cross-validation, and fits the solver on
//! the projected Gram matrix of the winner. Prediction estimates the
//! divergence from each test group to every training group and evaluates
//! the winning kernel on those values.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rsdm::api::SDM;
//! use rsdm::core::Group;
//! use rsdm::divergence::GaussianL2Divergence;
//! use rsdm::kernel::GaussianKernelGroup;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let train_groups: Vec<Group> = vec![];
//! # let train_labels: Vec<i32> = vec![];
//! # let test_groups: Vec<Group> = vec![];
//! let model = SDM::new(
//!     GaussianKernelGroup::new(vec![0.1, 1.0, 10.0], true),
//!     GaussianL2Divergence::new(),
//! )
//! .with_c_values(vec![0.1, 1.0, 10.0])
//! .with_folds(5)
//! .train(&train_groups, &train_labels)?;
//!
//! let (labels, decision_values) = model.predict(&test_groups)?;
//! # Ok(())
//! # }
//! ```

use crate::core::{
    validate_training_set, DivergenceEstimator, Group, Prediction, Result, SDMError,
    SolverConfig, SolverModel, SvmSolver,
};
use crate::divergence::GaussianL2Divergence;
use crate::kernel::{kernel_rows, DivergenceKernel, GaussianKernelGroup, KernelGroup};
use crate::selection::{ModelSelector, SelectionConfig};
use crate::solver::OneVsOneSvm;
use log::info;
use nalgebra::DMatrix;
use std::time::Duration;

/// Default C grid: 2^-5, 2^-3, ..., 2^15
pub fn default_c_values() -> Vec<f64> {
    (-5..=15).step_by(2).map(|e| 2f64.powi(e)).collect()
}

/// High-level SDM interface with builder pattern
pub struct SDM<G = GaussianKernelGroup, D = GaussianL2Divergence, S = OneVsOneSvm>
where
    G: KernelGroup,
    D: DivergenceEstimator,
    S: SvmSolver,
{
    kernel_group: G,
    divergence: D,
    solver: S,
    c_values: Vec<f64>,
    selection: SelectionConfig,
}

impl<G: KernelGroup, D: DivergenceEstimator> SDM<G, D, OneVsOneSvm> {
    /// Create an SDM with the built-in one-vs-one solver
    pub fn new(kernel_group: G, divergence: D) -> Self {
        Self {
            kernel_group,
            divergence,
            solver: OneVsOneSvm::default(),
            c_values: default_c_values(),
            selection: SelectionConfig::default(),
        }
    }

    fn with_solver_config(mut self, update: impl FnOnce(&mut SolverConfig)) -> Self {
        let mut config = self.solver.config().clone();
        update(&mut config);
        self.solver = OneVsOneSvm::new(config);
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(self, epsilon: f64) -> Self {
        self.with_solver_config(|config| config.epsilon = epsilon)
    }

    /// Set maximum number of SMO iterations per binary problem
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        self.with_solver_config(|config| config.max_iterations = max_iterations)
    }

    /// Report class probabilities instead of pairwise decision values
    pub fn with_probability(self, probability: bool) -> Self {
        self.with_solver_config(|config| config.probability = probability)
    }
}

impl<G: KernelGroup, D: DivergenceEstimator, S: SvmSolver> SDM<G, D, S> {
    /// Replace the solver
    pub fn with_solver<T: SvmSolver>(self, solver: T) -> SDM<G, D, T> {
        SDM {
            kernel_group: self.kernel_group,
            divergence: self.divergence,
            solver,
            c_values: self.c_values,
            selection: self.selection,
        }
    }

    /// Set candidate regularization parameters
    pub fn with_c_values(mut self, c_values: Vec<f64>) -> Self {
        self.c_values = c_values;
        self
    }

    /// Set the number of cross-validation folds
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.selection.folds = folds;
        self
    }

    /// Stop model selection after this much time (checked between candidates)
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.selection.time_budget = Some(budget);
        self
    }

    /// Cross-validate the C values of each kernel in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.selection.parallel = parallel;
        self
    }

    /// Train on groups with one label per group
    pub fn train(
        self,
        groups: &[Group],
        labels: &[i32],
    ) -> Result<TrainedSDM<G::Kernel, D, S::Model>> {
        validate_training_set(groups, labels)?;
        if self.c_values.is_empty() {
            return Err(SDMError::InvalidInput(
                "At least one C value is required".to_string(),
            ));
        }

        info!(
            "Training SDM on {} groups with {} C values",
            groups.len(),
            self.c_values.len()
        );

        let divergences = self.divergence.estimate(groups, groups)?;
        let selection = ModelSelector::new(self.selection).select(
            &divergences,
            labels,
            &self.kernel_group,
            &self.c_values,
            &self.solver,
        )?;
        let model = self.solver.fit(&selection.gram, labels, selection.c)?;

        Ok(TrainedSDM {
            kernel: selection.kernel,
            c: selection.c,
            cv_score: selection.score,
            model,
            gram: selection.gram,
            train_groups: groups.to_vec(),
            divergence: self.divergence,
            symmetrize: self.kernel_group.symmetrize_divergences(),
        })
    }
}

/// Trained SDM with high-level prediction interface
///
/// The model owns its solver state and a copy of the training groups.
/// [`TrainedSDM::destroy`] consumes the model; there is no way to predict
/// with it afterwards.
pub struct TrainedSDM<K, D, M>
where
    K: DivergenceKernel,
    D: DivergenceEstimator,
    M: SolverModel,
{
    kernel: K,
    c: f64,
    cv_score: Option<f64>,
    model: M,
    gram: DMatrix<f64>,
    train_groups: Vec<Group>,
    divergence: D,
    symmetrize: bool,
}

impl<K, D, M> TrainedSDM<K, D, M>
where
    K: DivergenceKernel,
    D: DivergenceEstimator,
    M: SolverModel,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        kernel: K,
        c: f64,
        cv_score: Option<f64>,
        model: M,
        gram: DMatrix<f64>,
        train_groups: Vec<Group>,
        divergence: D,
        symmetrize: bool,
    ) -> Self {
        Self {
            kernel,
            c,
            cv_score,
            model,
            gram,
            train_groups,
            divergence,
            symmetrize,
        }
    }

    /// Kernel rows between test groups and every training group
    fn test_kernel(&self, test_groups: &[Group]) -> Result<DMatrix<f64>> {
        let dim = self
            .train_groups
            .first()
            .map(|g| g.dim())
            .ok_or(SDMError::EmptyDataset)?;
        if let Some(bad) = test_groups.iter().find(|g| g.dim() != dim) {
            return Err(SDMError::DimensionMismatch {
                expected: dim,
                actual: bad.dim(),
            });
        }

        let mut divergences = self.divergence.estimate(test_groups, &self.train_groups)?;
        if self.symmetrize {
            let reverse = self.divergence.estimate(&self.train_groups, test_groups)?;
            divergences = (divergences + reverse.transpose()) * 0.5;
        }
        Ok(kernel_rows(&self.kernel, &divergences))
    }

    /// Predict labels and decision values for test groups
    ///
    /// Each row of the decision values holds the pairwise one-vs-one values
    /// (at least one column per class), or one probability per class when
    /// the solver was trained in probability mode.
    pub fn predict(&self, test_groups: &[Group]) -> Result<(Vec<i32>, Vec<Vec<f64>>)> {
        if test_groups.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let rows = self.test_kernel(test_groups)?;
        Ok((0..rows.nrows())
            .map(|i| {
                let row: Vec<f64> = rows.row(i).iter().copied().collect();
                let prediction = self.model.predict_one(&row);
                (prediction.label, prediction.values)
            })
            .unzip())
    }

    /// Predict a single test group
    pub fn predict_one(&self, group: &Group) -> Result<Prediction> {
        let rows = self.test_kernel(std::slice::from_ref(group))?;
        let row: Vec<f64> = rows.row(0).iter().copied().collect();
        Ok(self.model.predict_one(&row))
    }

    /// Accuracy on labeled test groups
    pub fn evaluate(&self, test_groups: &[Group], labels: &[i32]) -> Result<f64> {
        if test_groups.is_empty() {
            return Err(SDMError::EmptyDataset);
        }
        if test_groups.len() != labels.len() {
            return Err(SDMError::InvalidInput(format!(
                "Got {} groups but {} labels",
                test_groups.len(),
                labels.len()
            )));
        }

        let (predicted, _) = self.predict(test_groups)?;
        let correct = predicted
            .iter()
            .zip(labels)
            .filter(|(pred, actual)| pred == actual)
            .count();
        Ok(correct as f64 / labels.len() as f64)
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            kernel: self.kernel.name(),
            c: self.c,
            cv_score: self.cv_score,
            n_train_groups: self.train_groups.len(),
            classes: self.model.classes().to_vec(),
            n_support_vectors: self.model.n_support_vectors(),
        }
    }

    /// Winning kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Winning regularization parameter
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Cross-validation accuracy of the winner, if cross-validation ran
    pub fn cv_score(&self) -> Option<f64> {
        self.cv_score
    }

    /// Projected training kernel matrix the solver was fitted on
    pub fn gram(&self) -> &DMatrix<f64> {
        &self.gram
    }

    pub fn train_groups(&self) -> &[Group] {
        &self.train_groups
    }

    pub fn symmetrizes(&self) -> bool {
        self.symmetrize
    }

    /// Get the underlying solver model
    pub fn inner(&self) -> &M {
        &self.model
    }

    /// Release the solver model, kernel matrix and training groups
    pub fn destroy(self) {
        drop(self);
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub kernel: String,
    pub c: f64,
    pub cv_score: Option<f64>,
    pub n_train_groups: usize,
    pub classes: Vec<i32>,
    pub n_support_vectors: usize,
}
