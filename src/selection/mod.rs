//! Cross-validated model selection over (kernel, C) candidates
//!
//! Every candidate kernel gets one projected training Gram matrix. Each
//! (kernel, C) pair is scored by k-fold cross-validation on sub-blocks of
//! that matrix, and the best score wins. Candidates are visited
//! kernel-major, C-minor, and a later candidate only replaces the current
//! best on a strictly higher score.

use crate::core::{distinct_labels, Result, SDMError, SolverModel, SvmSolver};
use crate::kernel::{gram_matrix, prepare_divergences, DivergenceKernel, KernelGroup};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Configuration for cross-validated model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Number of cross-validation folds (clamped to [2, N])
    pub folds: usize,
    /// Stop visiting new candidates once this much time has passed
    pub time_budget: Option<Duration>,
    /// Evaluate the C values of one kernel on the rayon thread pool
    pub parallel: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            time_budget: None,
            parallel: false,
        }
    }
}

/// Deterministic stratified fold assignment
///
/// Groups are visited class by class (classes in first-seen order, members
/// in index order) and dealt to folds round-robin, so each fold receives a
/// near-equal share of every class.
pub fn fold_assignment(labels: &[i32], folds: usize) -> Vec<usize> {
    let n = labels.len();
    let folds = folds.clamp(2, n.max(2));
    let mut assignment = vec![0; n];
    let mut next = 0;

    for class in distinct_labels(labels) {
        for (i, _) in labels.iter().enumerate().filter(|(_, &l)| l == class) {
            assignment[i] = next % folds;
            next += 1;
        }
    }
    assignment
}

/// Candidate kernels crossed with candidate C values
#[derive(Debug, Clone)]
pub struct HyperparamGrid<K> {
    pub kernels: Vec<K>,
    pub c_values: Vec<f64>,
}

impl<K> HyperparamGrid<K> {
    pub fn new(kernels: Vec<K>, c_values: Vec<f64>) -> Self {
        Self { kernels, c_values }
    }

    pub fn len(&self) -> usize {
        self.kernels.len() * self.c_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (kernel index, C index) pairs in evaluation order
    pub fn candidates(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.kernels.len())
            .flat_map(move |k| (0..self.c_values.len()).map(move |c| (k, c)))
    }
}

/// Cross-validation accuracy per (kernel index, C index)
///
/// `None` marks a candidate that failed to fit or was never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct CvScores {
    n_c: usize,
    scores: Vec<Option<f64>>,
}

impl CvScores {
    fn new(n_kernels: usize, n_c: usize) -> Self {
        Self {
            n_c,
            scores: vec![None; n_kernels * n_c],
        }
    }

    fn set(&mut self, kernel_index: usize, c_index: usize, score: Option<f64>) {
        self.scores[kernel_index * self.n_c + c_index] = score;
    }

    pub fn get(&self, kernel_index: usize, c_index: usize) -> Option<f64> {
        self.scores
            .get(kernel_index * self.n_c + c_index)
            .copied()
            .flatten()
    }

    /// Number of candidates with a score
    pub fn n_scored(&self) -> usize {
        self.scores.iter().filter(|s| s.is_some()).count()
    }
}

/// Outcome of model selection
#[derive(Debug, Clone)]
pub struct Selection<K> {
    pub kernel: K,
    pub kernel_index: usize,
    pub c: f64,
    /// Cross-validation accuracy of the winner; `None` when the grid had a
    /// single candidate and no cross-validation ran
    pub score: Option<f64>,
    /// Projected training Gram matrix of the winning kernel
    pub gram: DMatrix<f64>,
    pub scores: CvScores,
}

/// Grid search with k-fold cross-validation
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    config: SelectionConfig,
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Pick the best (kernel, C) for the given training divergences
    pub fn select<G, S>(
        &self,
        divergences: &DMatrix<f64>,
        labels: &[i32],
        kernel_group: &G,
        c_values: &[f64],
        solver: &S,
    ) -> Result<Selection<G::Kernel>>
    where
        G: KernelGroup,
        S: SvmSolver,
    {
        if divergences.nrows() != labels.len() {
            return Err(SDMError::DimensionMismatch {
                expected: labels.len(),
                actual: divergences.nrows(),
            });
        }
        if c_values.is_empty() {
            return Err(SDMError::InvalidInput(
                "At least one C value is required".to_string(),
            ));
        }

        let divergences =
            prepare_divergences(divergences.clone(), kernel_group.symmetrize_divergences())?;
        let grid = HyperparamGrid::new(kernel_group.kernels(&divergences)?, c_values.to_vec());
        let projection = kernel_group.projection();
        let mut scores = CvScores::new(grid.kernels.len(), grid.c_values.len());

        if grid.len() == 1 {
            let kernel = grid.kernels[0].clone();
            debug!(
                "Single candidate {} with C={}; skipping cross-validation",
                kernel.name(),
                c_values[0]
            );
            let gram = gram_matrix(&kernel, &divergences, projection)?;
            return Ok(Selection {
                kernel,
                kernel_index: 0,
                c: c_values[0],
                score: None,
                gram,
                scores,
            });
        }

        let assignment = fold_assignment(labels, self.config.folds);
        let started = Instant::now();
        let mut best: Option<(usize, usize, f64, DMatrix<f64>)> = None;
        let mut evaluated = 0;

        for (kernel_index, kernel) in grid.kernels.iter().enumerate() {
            if evaluated > 0 && self.budget_exhausted(started) {
                break;
            }
            let gram = gram_matrix(kernel, &divergences, projection)?;
            let mut out_of_time = false;

            let kernel_scores: Vec<Option<f64>> = if self.config.parallel {
                evaluated += grid.c_values.len();
                grid.c_values
                    .par_iter()
                    .map(|&c| cross_validate(solver, &gram, labels, &assignment, c))
                    .collect()
            } else {
                let mut kernel_scores = Vec::with_capacity(grid.c_values.len());
                for &c in &grid.c_values {
                    if evaluated > 0 && self.budget_exhausted(started) {
                        out_of_time = true;
                        break;
                    }
                    kernel_scores.push(cross_validate(solver, &gram, labels, &assignment, c));
                    evaluated += 1;
                }
                kernel_scores
            };

            for (c_index, &score) in kernel_scores.iter().enumerate() {
                match score {
                    Some(accuracy) => debug!(
                        "{} with C={}: cross-validation accuracy {:.4}",
                        kernel.name(),
                        grid.c_values[c_index],
                        accuracy
                    ),
                    None => warn!(
                        "{} with C={}: solver failed, candidate skipped",
                        kernel.name(),
                        grid.c_values[c_index]
                    ),
                }
                scores.set(kernel_index, c_index, score);
            }
            Self::record_best(&mut best, kernel_index, &kernel_scores, &gram);
            if out_of_time {
                break;
            }
        }

        let (kernel_index, c_index, score, gram) = best.ok_or_else(|| {
            SDMError::Selection(format!(
                "All {} hyperparameter candidates failed to fit",
                grid.len()
            ))
        })?;
        let kernel = grid.kernels[kernel_index].clone();
        let c = grid.c_values[c_index];

        info!(
            "Selected {} with C={} (cross-validation accuracy {:.4}, {} of {} candidates scored)",
            kernel.name(),
            c,
            score,
            scores.n_scored(),
            grid.len()
        );

        Ok(Selection {
            kernel,
            kernel_index,
            c,
            score: Some(score),
            gram,
            scores,
        })
    }

    fn budget_exhausted(&self, started: Instant) -> bool {
        match self.config.time_budget {
            Some(budget) if started.elapsed() >= budget => {
                warn!(
                    "Model selection time budget of {:?} exhausted; remaining candidates skipped",
                    budget
                );
                true
            }
            _ => false,
        }
    }

    /// Replace the current best on strict improvement only
    fn record_best(
        best: &mut Option<(usize, usize, f64, DMatrix<f64>)>,
        kernel_index: usize,
        kernel_scores: &[Option<f64>],
        gram: &DMatrix<f64>,
    ) {
        for (c_index, score) in kernel_scores.iter().enumerate() {
            let Some(score) = *score else { continue };
            let improves = match best {
                Some((_, _, best_score, _)) => score > *best_score,
                None => true,
            };
            if improves {
                *best = Some((kernel_index, c_index, score, gram.clone()));
            }
        }
    }
}

/// Accuracy of `solver` with regularization `c` over all folds
///
/// Returns None if any fold fails to fit.
fn cross_validate<S: SvmSolver>(
    solver: &S,
    gram: &DMatrix<f64>,
    labels: &[i32],
    assignment: &[usize],
    c: f64,
) -> Option<f64> {
    let n_folds = assignment.iter().max().map_or(0, |&f| f + 1);
    let mut correct = 0;
    let mut total = 0;

    for fold in 0..n_folds {
        let (test, train): (Vec<usize>, Vec<usize>) =
            (0..labels.len()).partition(|&i| assignment[i] == fold);
        if test.is_empty() || train.is_empty() {
            continue;
        }

        let sub_gram = gram.select_rows(&train).select_columns(&train);
        let sub_labels: Vec<i32> = train.iter().map(|&i| labels[i]).collect();
        let model = match solver.fit(&sub_gram, &sub_labels, c) {
            Ok(model) => model,
            Err(e) => {
                debug!("Fold {} failed to fit with C={}: {}", fold, c, e);
                return None;
            }
        };

        for &t in &test {
            let row: Vec<f64> = train.iter().map(|&j| gram[(t, j)]).collect();
            if model.predict_one(&row).label == labels[t] {
                correct += 1;
            }
            total += 1;
        }
    }

    if total == 0 {
        None
    } else {
        Some(correct as f64 / total as f64)
    }
}
