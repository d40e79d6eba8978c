//! Sequential Minimal Optimization (SMO) solver for precomputed kernels
//!
//! Solves the binary C-SVC dual problem
//!
//! ```text
//! min  ½ αᵀQα - eᵀα   s.t.  yᵀα = 0,  0 ≤ αᵢ ≤ C,  Qᵢⱼ = yᵢ yⱼ Kᵢⱼ
//! ```
//!
//! on a subset of rows/columns of a precomputed kernel matrix. Each
//! iteration optimizes the maximal violating pair chosen with second-order
//! information, so no kernel values are ever recomputed.

use crate::core::{Result, SDMError, SolverConfig};
use log::{debug, warn};
use nalgebra::DMatrix;

/// Substitute for non-positive curvature in the two-variable subproblem
const TAU: f64 = 1e-12;

/// Result of optimization process
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values), one per problem index
    pub alpha: Vec<f64>,
    /// Offset of the decision function: f(x) = Σ αᵢ yᵢ K(x, xᵢ) - rho
    pub rho: f64,
    /// Positions (into the problem indices) where alpha > 0
    pub support_vectors: Vec<usize>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Final dual objective value
    pub objective_value: f64,
}

/// A binary problem over a subset of a shared kernel matrix
pub struct BinaryProblem<'a> {
    kernel: &'a DMatrix<f64>,
    indices: &'a [usize],
    y: &'a [f64],
}

impl<'a> BinaryProblem<'a> {
    /// `indices` select rows/columns of `kernel`; `y` holds ±1 per index
    pub fn new(kernel: &'a DMatrix<f64>, indices: &'a [usize], y: &'a [f64]) -> Result<Self> {
        if indices.len() != y.len() {
            return Err(SDMError::DimensionMismatch {
                expected: indices.len(),
                actual: y.len(),
            });
        }
        if let Some(&bad) = indices
            .iter()
            .find(|&&i| i >= kernel.nrows() || i >= kernel.ncols())
        {
            return Err(SDMError::InvalidInput(format!(
                "Index {} out of range for {}x{} kernel",
                bad,
                kernel.nrows(),
                kernel.ncols()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&v| v != 1.0 && v != -1.0) {
            return Err(SDMError::InvalidInput(format!(
                "Binary labels must be -1 or +1, got {}",
                bad
            )));
        }
        Ok(Self { kernel, indices, y })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    fn k(&self, a: usize, b: usize) -> f64 {
        self.kernel[(self.indices[a], self.indices[b])]
    }

    #[inline]
    fn q(&self, a: usize, b: usize) -> f64 {
        self.y[a] * self.y[b] * self.k(a, b)
    }
}

/// SMO solver for SVM optimization
pub struct SMOSolver {
    config: SolverConfig,
}

impl SMOSolver {
    /// Create a new SMO solver; `config.c` is ignored in favour of the
    /// per-call C
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve the SVM dual problem with upper bound `c`
    pub fn solve(&self, problem: &BinaryProblem<'_>, c: f64) -> Result<OptimizationResult> {
        if problem.is_empty() {
            return Err(SDMError::EmptyDataset);
        }
        if !(c > 0.0 && c.is_finite()) {
            return Err(SDMError::InvalidInput(format!(
                "C must be positive, got: {}",
                c
            )));
        }

        let n = problem.len();
        let y = problem.y;
        let diag: Vec<f64> = (0..n).map(|i| problem.k(i, i)).collect();

        let mut alpha = vec![0.0; n];
        // Gradient of the dual objective: G = Qα - e
        let mut gradient = vec![-1.0; n];
        let mut iterations = 0;

        loop {
            let (i, j) = match self.select_working_set(problem, &alpha, &gradient, &diag, c) {
                Some(pair) => pair,
                None => break,
            };

            if iterations >= self.config.max_iterations {
                warn!(
                    "SMO reached the iteration limit ({}) before convergence",
                    self.config.max_iterations
                );
                break;
            }
            iterations += 1;

            self.take_step(problem, i, j, &mut alpha, &mut gradient, &diag, c);
        }

        let rho = self.calculate_rho(y, &alpha, &gradient, c);
        let objective_value = self.calculate_objective(&alpha, &gradient);

        let support_vectors: Vec<usize> = alpha
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| if a > 0.0 { Some(i) } else { None })
            .collect();

        debug!(
            "SMO finished: {} iterations, {} support vectors, objective {:.6}",
            iterations,
            support_vectors.len(),
            objective_value
        );

        Ok(OptimizationResult {
            alpha,
            rho,
            support_vectors,
            iterations,
            objective_value,
        })
    }

    /// Select the maximal violating pair using second-order information
    ///
    /// Returns None when the KKT violation is below epsilon.
    fn select_working_set(
        &self,
        problem: &BinaryProblem<'_>,
        alpha: &[f64],
        gradient: &[f64],
        diag: &[f64],
        c: f64,
    ) -> Option<(usize, usize)> {
        let y = problem.y;
        let n = problem.len();

        // i = argmax { -yₜ Gₜ : t in I_up }
        let mut g_max = f64::NEG_INFINITY;
        let mut best_i = None;
        for t in 0..n {
            if y[t] > 0.0 {
                if alpha[t] < c && -gradient[t] >= g_max {
                    g_max = -gradient[t];
                    best_i = Some(t);
                }
            } else if alpha[t] > 0.0 && gradient[t] >= g_max {
                g_max = gradient[t];
                best_i = Some(t);
            }
        }
        let i = best_i?;

        // j minimizes the second-order decrease among I_low
        let mut g_max2 = f64::NEG_INFINITY;
        let mut best_j = None;
        let mut obj_diff_min = f64::INFINITY;
        for j in 0..n {
            let q_ij = problem.q(i, j);
            if y[j] > 0.0 {
                if alpha[j] > 0.0 {
                    let grad_diff = g_max + gradient[j];
                    if gradient[j] >= g_max2 {
                        g_max2 = gradient[j];
                    }
                    if grad_diff > 0.0 {
                        let quad = diag[i] + diag[j] - 2.0 * y[i] * q_ij;
                        let quad = if quad > 0.0 { quad } else { TAU };
                        let obj_diff = -(grad_diff * grad_diff) / quad;
                        if obj_diff <= obj_diff_min {
                            best_j = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else if alpha[j] < c {
                let grad_diff = g_max - gradient[j];
                if -gradient[j] >= g_max2 {
                    g_max2 = -gradient[j];
                }
                if grad_diff > 0.0 {
                    let quad = diag[i] + diag[j] + 2.0 * y[i] * q_ij;
                    let quad = if quad > 0.0 { quad } else { TAU };
                    let obj_diff = -(grad_diff * grad_diff) / quad;
                    if obj_diff <= obj_diff_min {
                        best_j = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if g_max + g_max2 < self.config.epsilon {
            return None;
        }
        best_j.map(|j| (i, j))
    }

    /// Optimize the two-variable subproblem for (i, j) and update gradients
    #[allow(clippy::too_many_arguments)]
    fn take_step(
        &self,
        problem: &BinaryProblem<'_>,
        i: usize,
        j: usize,
        alpha: &mut [f64],
        gradient: &mut [f64],
        diag: &[f64],
        c: f64,
    ) {
        let y = problem.y;
        let q_ij = problem.q(i, j);
        let alpha_i_old = alpha[i];
        let alpha_j_old = alpha[j];

        if y[i] != y[j] {
            let mut quad = diag[i] + diag[j] + 2.0 * q_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-gradient[i] - gradient[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else {
                if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            }
        } else {
            let mut quad = diag[i] + diag[j] - 2.0 * q_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (gradient[i] - gradient[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = sum;
                }
                if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = sum;
                }
            }
        }

        let delta_i = alpha[i] - alpha_i_old;
        let delta_j = alpha[j] - alpha_j_old;
        for (k, g) in gradient.iter_mut().enumerate() {
            *g += problem.q(i, k) * delta_i + problem.q(j, k) * delta_j;
        }
    }

    /// Offset from free support vectors, or the midpoint of the feasible
    /// interval when every alpha sits at a bound
    fn calculate_rho(&self, y: &[f64], alpha: &[f64], gradient: &[f64], c: f64) -> f64 {
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0;

        for t in 0..alpha.len() {
            let yg = y[t] * gradient[t];
            if alpha[t] >= c {
                if y[t] < 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else if alpha[t] <= 0.0 {
                if y[t] > 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else {
                free_sum += yg;
                free_count += 1;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            (upper + lower) / 2.0
        }
    }

    /// Dual objective ½ αᵀQα - eᵀα, recovered from the gradient
    fn calculate_objective(&self, alpha: &[f64], gradient: &[f64]) -> f64 {
        alpha
            .iter()
            .zip(gradient)
            .map(|(&a, &g)| a * (g - 1.0))
            .sum::<f64>()
            / 2.0
    }
}
