//! Core type definitions for SDM

use crate::core::{Result, SDMError};
use serde::{Deserialize, Serialize};

/// A set of i.i.d. samples drawn from one underlying distribution
///
/// Every point in a group has the same dimension. Groups are immutable
/// once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    points: Vec<Vec<f64>>,
    dim: usize,
}

impl Group {
    /// Create a group, checking that it is non-empty and that all points
    /// share one dimension
    pub fn new(points: Vec<Vec<f64>>) -> Result<Self> {
        let dim = match points.first() {
            Some(first) => first.len(),
            None => return Err(SDMError::EmptyDataset),
        };
        if dim == 0 {
            return Err(SDMError::InvalidInput(
                "Group points must have at least one coordinate".to_string(),
            ));
        }
        if let Some(bad) = points.iter().find(|p| p.len() != dim) {
            return Err(SDMError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }
        Ok(Self { points, dim })
    }

    /// Create a one-dimensional group from scalar samples
    pub fn from_scalars(values: &[f64]) -> Result<Self> {
        Self::new(values.iter().map(|&v| vec![v]).collect())
    }

    /// Number of samples in the group
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed group
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Dimension of every point
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// Values of coordinate `d` across all points
    ///
    /// # Panics
    /// Panics if d >= dim()
    pub fn column(&self, d: usize) -> impl Iterator<Item = f64> + '_ {
        assert!(d < self.dim, "Coordinate {} out of range for dim {}", d, self.dim);
        self.points.iter().map(move |p| p[d])
    }
}

/// Prediction for a single test group
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class label
    pub label: i32,
    /// Pairwise decision values (zero-padded to at least one column per
    /// class), or one probability per class in probability mode
    pub values: Vec<f64>,
}

impl Prediction {
    pub fn new(label: i32, values: Vec<f64>) -> Self {
        Self { label, values }
    }

    /// Magnitude of the first decision value
    pub fn confidence(&self) -> f64 {
        self.values.first().map(|v| v.abs()).unwrap_or(0.0)
    }
}

/// Configuration for the built-in SVM solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance for the maximal KKT violation
    pub epsilon: f64,
    /// Maximum number of SMO iterations per binary problem
    pub max_iterations: usize,
    /// Fit Platt sigmoids and report class probabilities
    pub probability: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 10_000_000,
            probability: false,
        }
    }
}

/// Check that `groups` and `labels` describe a usable training set
pub fn validate_training_set(groups: &[Group], labels: &[i32]) -> Result<()> {
    if groups.is_empty() {
        return Err(SDMError::InvalidInput(
            "Training requires at least one group".to_string(),
        ));
    }
    if groups.len() != labels.len() {
        return Err(SDMError::InvalidInput(format!(
            "Got {} groups but {} labels",
            groups.len(),
            labels.len()
        )));
    }
    let dim = groups[0].dim();
    if let Some(bad) = groups.iter().find(|g| g.dim() != dim) {
        return Err(SDMError::DimensionMismatch {
            expected: dim,
            actual: bad.dim(),
        });
    }
    if distinct_labels(labels).len() < 2 {
        return Err(SDMError::InvalidInput(
            "Training requires at least 2 distinct labels".to_string(),
        ));
    }
    Ok(())
}

/// Distinct labels in order of first appearance
pub fn distinct_labels(labels: &[i32]) -> Vec<i32> {
    let mut classes = Vec::new();
    for &label in labels {
        if !classes.contains(&label) {
            classes.push(label);
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_creation() {
        let group = Group::new(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(group.len(), 3);
        assert_eq!(group.dim(), 2);
        assert!(!group.is_empty());
        assert_eq!(group.column(1).collect::<Vec<_>>(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_group_from_scalars() {
        let group = Group::from_scalars(&[0.5, -1.0]).unwrap();
        assert_eq!(group.dim(), 1);
        assert_eq!(group.points(), &[vec![0.5], vec![-1.0]]);
    }

    #[test]
    fn test_group_rejects_ragged_points() {
        let result = Group::new(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(
            result,
            Err(SDMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_group_rejects_empty() {
        assert!(matches!(Group::new(vec![]), Err(SDMError::EmptyDataset)));
        assert!(matches!(
            Group::new(vec![vec![]]),
            Err(SDMError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_distinct_labels_first_seen_order() {
        assert_eq!(distinct_labels(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(distinct_labels(&[]).is_empty());
    }

    #[test]
    fn test_validate_training_set() {
        let g = Group::from_scalars(&[1.0, 2.0]).unwrap();
        let groups = vec![g.clone(), g.clone()];

        assert!(validate_training_set(&groups, &[0, 1]).is_ok());
        assert!(matches!(
            validate_training_set(&groups, &[0]),
            Err(SDMError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_training_set(&groups, &[1, 1]),
            Err(SDMError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_training_set(&[], &[]),
            Err(SDMError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_training_set_mixed_dimensions() {
        let a = Group::from_scalars(&[1.0]).unwrap();
        let b = Group::new(vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            validate_training_set(&[a, b], &[0, 1]),
            Err(SDMError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_prediction_confidence() {
        let pred = Prediction::new(1, vec![-0.25, 0.0]);
        assert_eq!(pred.confidence(), 0.25);
        assert_eq!(Prediction::new(0, vec![]).confidence(), 0.0);
    }

    #[test]
    fn test_solver_config_default() {
        let config = SolverConfig::default();
        assert_eq!(config.c, 1.0);
        assert_eq!(config.epsilon, 0.001);
        assert!(!config.probability);
    }
}
