//! Probability estimates for the one-vs-one solver
//!
//! Each binary problem gets a Platt sigmoid P(y=+1 | f) = 1 / (1 + exp(A f + B)),
//! fitted on cross-validated decision values with Newton's method and a
//! backtracking line search. Pairwise probabilities are coupled into one
//! distribution over all classes with the iterative pairwise-coupling
//! method.

use crate::core::Result;
use crate::solver::smo::{BinaryProblem, SMOSolver};
use log::warn;
use nalgebra::DMatrix;

/// Folds used to produce out-of-sample decision values for the sigmoid fit
pub const PROBABILITY_FOLDS: usize = 5;

/// Pairwise probabilities are kept inside [MIN_PROBABILITY, 1 - MIN_PROBABILITY]
pub const MIN_PROBABILITY: f64 = 1e-7;

/// Out-of-sample decision values for every item of a binary problem
///
/// Items are dealt to folds round-robin in index order. A fold whose
/// training part holds a single class gets a constant ±1 decision value.
pub fn cross_validated_decision_values(
    smo: &SMOSolver,
    kernel: &DMatrix<f64>,
    indices: &[usize],
    y: &[f64],
    c: f64,
) -> Result<Vec<f64>> {
    let n = indices.len();
    let folds = PROBABILITY_FOLDS.min(n).max(1);
    let mut values = vec![0.0; n];

    for fold in 0..folds {
        let held_out: Vec<usize> = (0..n).filter(|p| p % folds == fold).collect();
        let kept: Vec<usize> = (0..n).filter(|p| p % folds != fold).collect();

        let positives = kept.iter().filter(|&&p| y[p] > 0.0).count();
        let negatives = kept.len() - positives;

        if positives == 0 || negatives == 0 {
            let constant = if positives > 0 {
                1.0
            } else if negatives > 0 {
                -1.0
            } else {
                0.0
            };
            for &p in &held_out {
                values[p] = constant;
            }
            continue;
        }

        let sub_indices: Vec<usize> = kept.iter().map(|&p| indices[p]).collect();
        let sub_y: Vec<f64> = kept.iter().map(|&p| y[p]).collect();
        let problem = BinaryProblem::new(kernel, &sub_indices, &sub_y)?;
        let result = smo.solve(&problem, c)?;

        for &p in &held_out {
            let row = indices[p];
            values[p] = result
                .support_vectors
                .iter()
                .map(|&s| result.alpha[s] * sub_y[s] * kernel[(row, sub_indices[s])])
                .sum::<f64>()
                - result.rho;
        }
    }

    Ok(values)
}

/// Fit the sigmoid parameters (A, B) to decision values and ±1 labels
pub fn sigmoid_train(decision_values: &[f64], y: &[f64]) -> (f64, f64) {
    let prior1 = y.iter().filter(|&&v| v > 0.0).count() as f64;
    let prior0 = y.len() as f64 - prior1;

    let max_iterations = 100;
    let min_step = 1e-10;
    // Keeps the Hessian positive definite
    let sigma = 1e-12;
    let eps = 1e-5;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = y
        .iter()
        .map(|&v| if v > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decision_values
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    t * f_apb + (1.0 + (-f_apb).exp()).ln()
                } else {
                    (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    let mut iteration = 0;
    while iteration < max_iterations {
        let mut h11 = sigma;
        let mut h22 = sigma;
        let mut h21 = 0.0;
        let mut g1 = 0.0;
        let mut g2 = 0.0;

        for (&f, &t) in decision_values.iter().zip(&targets) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < eps && g2.abs() < eps {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let d_a = -(h22 * g1 - h21 * g2) / det;
        let d_b = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * d_a + g2 * d_b;

        let mut step = 1.0;
        while step >= min_step {
            let new_a = a + step * d_a;
            let new_b = b + step * d_b;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < min_step {
            warn!("Sigmoid fit: line search failed");
            break;
        }
        iteration += 1;
    }

    if iteration >= max_iterations {
        warn!("Sigmoid fit reached the iteration limit");
    }
    (a, b)
}

/// P(y = +1) for a decision value under the sigmoid (A, B)
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Couple pairwise probabilities `r[i][j] = P(class i | class i or j)`
/// into one distribution over `k` classes
pub fn multiclass_probability(r: &[Vec<f64>]) -> Vec<f64> {
    let k = r.len();
    if k == 2 {
        return vec![r[0][1], r[1][0]];
    }

    let max_iterations = 100.max(k);
    let eps = 0.005 / k as f64;
    let mut p = vec![1.0 / k as f64; k];
    let mut q = vec![vec![0.0; k]; k];
    let mut qp = vec![0.0; k];

    for t in 0..k {
        for j in 0..t {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = q[j][t];
        }
        for j in (t + 1)..k {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut iteration = 0;
    while iteration < max_iterations {
        let mut pqp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            pqp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - pqp).abs())
            .fold(0.0, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + pqp) / q[t][t];
            p[t] += diff;
            pqp = (pqp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iteration += 1;
    }

    if iteration >= max_iterations {
        warn!("Pairwise coupling reached the iteration limit");
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SolverConfig;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sigmoid_predict_is_monotone_for_negative_a() {
        // A < 0: larger decision values mean higher P(+1)
        let (a, b) = (-2.0, 0.0);
        assert_abs_diff_eq!(sigmoid_predict(0.0, a, b), 0.5, epsilon = 1e-12);
        assert!(sigmoid_predict(1.0, a, b) > sigmoid_predict(0.5, a, b));
        assert!(sigmoid_predict(-1.0, a, b) < 0.5);
    }

    #[test]
    fn test_sigmoid_train_orders_classes() {
        let decision_values = [2.0, 1.5, 0.7, -0.1, -1.2, -1.9, 0.2, -0.4];
        let y = [1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0];
        let (a, b) = sigmoid_train(&decision_values, &y);

        assert!(a < 0.0);
        assert!(sigmoid_predict(2.0, a, b) > 0.5);
        assert!(sigmoid_predict(-2.0, a, b) < 0.5);
        assert!(b.is_finite());
    }

    #[test]
    fn test_multiclass_probability_binary_passthrough() {
        let r = vec![vec![0.0, 0.8], vec![0.2, 0.0]];
        assert_eq!(multiclass_probability(&r), vec![0.8, 0.2]);
    }

    #[test]
    fn test_multiclass_probability_sums_to_one() {
        let r = vec![
            vec![0.0, 0.7, 0.8],
            vec![0.3, 0.0, 0.6],
            vec![0.2, 0.4, 0.0],
        ];
        let p = multiclass_probability(&r);
        assert_abs_diff_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn test_multiclass_probability_uniform_for_even_pairs() {
        let r = vec![vec![0.5; 3]; 3];
        let p = multiclass_probability(&r);
        for &v in &p {
            assert_abs_diff_eq!(v, 1.0 / 3.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cross_validated_decision_values_signs() {
        let points = [2.0, -2.0, 1.5, -1.5, 1.8, -1.8, 2.2, -2.2, 1.6, -1.6];
        let kernel = DMatrix::from_fn(10, 10, |i, j| points[i] * points[j]);
        let indices: Vec<usize> = (0..10).collect();
        let y: Vec<f64> = points.iter().map(|&p| if p > 0.0 { 1.0 } else { -1.0 }).collect();
        let smo = SMOSolver::new(SolverConfig::default());

        let values = cross_validated_decision_values(&smo, &kernel, &indices, &y, 1.0).unwrap();
        for (v, label) in values.iter().zip(&y) {
            assert!(v * label > 0.0);
        }
    }
}
