//! One-vs-one multiclass reduction over the binary SMO solver
//!
//! Classes keep their order of first appearance in the training labels.
//! Every pair (p, q) with p < q gets its own binary problem in which class
//! p is the positive side. Prediction runs all pairwise decision functions
//! and lets them vote.

use crate::core::{
    distinct_labels, Prediction, Result, SDMError, SolverConfig, SolverModel, SvmSolver,
};
use crate::solver::probability::{
    cross_validated_decision_values, multiclass_probability, sigmoid_predict, sigmoid_train,
    MIN_PROBABILITY,
};
use crate::solver::smo::{BinaryProblem, SMOSolver};
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Decision function for one pair of classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryModel {
    /// Index of the positive class in the model's class list
    pub positive: usize,
    /// Index of the negative class
    pub negative: usize,
    /// Training indices with a non-zero coefficient
    pub support: Vec<usize>,
    /// αᵢ yᵢ for each support index
    pub coef: Vec<f64>,
    pub rho: f64,
    /// Platt sigmoid (A, B), present in probability mode
    pub sigmoid: Option<(f64, f64)>,
}

impl BinaryModel {
    /// f(x) = Σ coefᵢ K(x, xᵢ) - rho
    pub fn decision_value(&self, kernel_row: &[f64]) -> f64 {
        self.support
            .iter()
            .zip(&self.coef)
            .map(|(&s, &coef)| coef * kernel_row[s])
            .sum::<f64>()
            - self.rho
    }
}

/// Fitted one-vs-one classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneVsOneModel {
    classes: Vec<i32>,
    n_train: usize,
    pairs: Vec<BinaryModel>,
    probability: bool,
}

impl OneVsOneModel {
    /// Pairwise models in (0,1), (0,2), ..., (1,2), ... order
    pub fn pairs(&self) -> &[BinaryModel] {
        &self.pairs
    }

    /// Number of training items the kernel rows must cover
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    pub fn has_probability(&self) -> bool {
        self.probability
    }

    /// Pairwise decision values in pair order
    pub fn decision_values(&self, kernel_row: &[f64]) -> Vec<f64> {
        self.pairs
            .iter()
            .map(|pair| pair.decision_value(kernel_row))
            .collect()
    }

    fn vote(&self, decision_values: &[f64]) -> usize {
        let mut votes = vec![0usize; self.classes.len()];
        for (pair, &value) in self.pairs.iter().zip(decision_values) {
            if value > 0.0 {
                votes[pair.positive] += 1;
            } else {
                votes[pair.negative] += 1;
            }
        }

        let mut winner = 0;
        for (index, &count) in votes.iter().enumerate() {
            if count > votes[winner] {
                winner = index;
            }
        }
        winner
    }

    fn probabilities(&self, decision_values: &[f64]) -> Vec<f64> {
        let k = self.classes.len();
        let mut pairwise = vec![vec![0.0; k]; k];
        for (pair, &value) in self.pairs.iter().zip(decision_values) {
            let (a, b) = pair.sigmoid.unwrap_or((0.0, 0.0));
            let r = sigmoid_predict(value, a, b).clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
            pairwise[pair.positive][pair.negative] = r;
            pairwise[pair.negative][pair.positive] = 1.0 - r;
        }
        multiclass_probability(&pairwise)
    }
}

impl SolverModel for OneVsOneModel {
    fn predict_one(&self, kernel_row: &[f64]) -> Prediction {
        debug_assert_eq!(kernel_row.len(), self.n_train);
        let decision_values = self.decision_values(kernel_row);

        if self.probability {
            let probabilities = self.probabilities(&decision_values);
            let mut best = 0;
            for (index, &p) in probabilities.iter().enumerate() {
                if p > probabilities[best] {
                    best = index;
                }
            }
            return Prediction::new(self.classes[best], probabilities);
        }

        let winner = self.vote(&decision_values);
        let width = decision_values.len().max(self.classes.len());
        let mut values = decision_values;
        values.resize(width, 0.0);
        Prediction::new(self.classes[winner], values)
    }

    fn classes(&self) -> &[i32] {
        &self.classes
    }

    fn n_support_vectors(&self) -> usize {
        let mut used = vec![false; self.n_train];
        for pair in &self.pairs {
            for &s in &pair.support {
                used[s] = true;
            }
        }
        used.iter().filter(|&&u| u).count()
    }
}

/// One-vs-one C-SVC over precomputed kernel matrices
#[derive(Debug, Clone, Default)]
pub struct OneVsOneSvm {
    config: SolverConfig,
}

impl OneVsOneSvm {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl SvmSolver for OneVsOneSvm {
    type Model = OneVsOneModel;

    fn fit(&self, kernel: &DMatrix<f64>, labels: &[i32], c: f64) -> Result<OneVsOneModel> {
        if !kernel.is_square() {
            return Err(SDMError::InvalidInput(format!(
                "Kernel matrix must be square, got {}x{}",
                kernel.nrows(),
                kernel.ncols()
            )));
        }
        if kernel.nrows() != labels.len() {
            return Err(SDMError::DimensionMismatch {
                expected: labels.len(),
                actual: kernel.nrows(),
            });
        }
        if !(c > 0.0 && c.is_finite()) {
            return Err(SDMError::InvalidInput(format!(
                "C must be positive, got: {}",
                c
            )));
        }

        let classes = distinct_labels(labels);
        if classes.len() < 2 {
            return Err(SDMError::InvalidInput(
                "Training requires at least 2 distinct labels".to_string(),
            ));
        }

        let members: Vec<Vec<usize>> = classes
            .iter()
            .map(|&class| {
                labels
                    .iter()
                    .enumerate()
                    .filter(|(_, &label)| label == class)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let smo = SMOSolver::new(self.config.clone());
        let mut pairs = Vec::with_capacity(classes.len() * (classes.len() - 1) / 2);

        for p in 0..classes.len() {
            for q in (p + 1)..classes.len() {
                let indices: Vec<usize> = members[p].iter().chain(&members[q]).copied().collect();
                let y: Vec<f64> = std::iter::repeat(1.0)
                    .take(members[p].len())
                    .chain(std::iter::repeat(-1.0).take(members[q].len()))
                    .collect();

                let problem = BinaryProblem::new(kernel, &indices, &y)?;
                let result = smo.solve(&problem, c)?;

                let sigmoid = if self.config.probability {
                    let values = cross_validated_decision_values(&smo, kernel, &indices, &y, c)?;
                    Some(sigmoid_train(&values, &y))
                } else {
                    None
                };

                debug!(
                    "Pair ({}, {}): {} support vectors, rho {:.6}",
                    classes[p],
                    classes[q],
                    result.support_vectors.len(),
                    result.rho
                );

                pairs.push(BinaryModel {
                    positive: p,
                    negative: q,
                    support: result.support_vectors.iter().map(|&s| indices[s]).collect(),
                    coef: result
                        .support_vectors
                        .iter()
                        .map(|&s| result.alpha[s] * y[s])
                        .collect(),
                    rho: result.rho,
                    sigmoid,
                });
            }
        }

        Ok(OneVsOneModel {
            classes,
            n_train: labels.len(),
            pairs,
            probability: self.config.probability,
        })
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }
}
