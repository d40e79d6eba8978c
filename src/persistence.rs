//! Model serialization and persistence
//!
//! A trained SDM needs its training groups at prediction time, so the saved
//! file carries them next to the winning kernel, C and the fitted solver.
//! The divergence estimator is not saved; the caller supplies it again when
//! loading.

use crate::api::TrainedSDM;
use crate::core::{DivergenceEstimator, Group, Result, SDMError};
use crate::kernel::{DivergenceKernel, GaussianKernel};
use crate::solver::OneVsOneModel;
use nalgebra::DMatrix;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serializable representation of a trained SDM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel<K = GaussianKernel> {
    /// Winning kernel
    pub kernel: K,
    /// Winning regularization parameter
    pub c: f64,
    /// Cross-validation accuracy of the winner
    pub cv_score: Option<f64>,
    /// Whether test divergences are averaged over both directions
    pub symmetrize: bool,
    /// Fitted one-vs-one solver
    pub solver_model: OneVsOneModel,
    /// Projected training kernel matrix of the winning kernel
    pub gram: DMatrix<f64>,
    /// Training groups, in training order
    pub train_groups: Vec<Group>,
    /// Model metadata
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Kernel description
    pub kernel_name: String,
    pub n_train_groups: usize,
    pub n_support_vectors: usize,
    /// Class labels in solver order
    pub classes: Vec<i32>,
    /// Creation timestamp
    pub created_at: String,
}

impl<K> SerializableModel<K>
where
    K: DivergenceKernel + Serialize + DeserializeOwned,
{
    /// Create a serializable model from a trained model
    pub fn from_trained<D: DivergenceEstimator>(
        model: &TrainedSDM<K, D, OneVsOneModel>,
    ) -> Self {
        let info = model.info();

        Self {
            kernel: model.kernel().clone(),
            c: model.c(),
            cv_score: model.cv_score(),
            symmetrize: model.symmetrizes(),
            solver_model: model.inner().clone(),
            gram: model.gram().clone(),
            train_groups: model.train_groups().to_vec(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                kernel_name: info.kernel,
                n_train_groups: info.n_train_groups,
                n_support_vectors: info.n_support_vectors,
                classes: info.classes,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Rebuild a trained model around the given divergence estimator
    pub fn into_trained<D: DivergenceEstimator>(
        self,
        divergence: D,
    ) -> Result<TrainedSDM<K, D, OneVsOneModel>> {
        if self.train_groups.is_empty() {
            return Err(SDMError::InvalidInput(
                "Saved model has no training groups".to_string(),
            ));
        }
        if self.solver_model.n_train() != self.train_groups.len() {
            return Err(SDMError::DimensionMismatch {
                expected: self.solver_model.n_train(),
                actual: self.train_groups.len(),
            });
        }
        let n = self.train_groups.len();
        if self.gram.shape() != (n, n) {
            return Err(SDMError::DimensionMismatch {
                expected: n,
                actual: self.gram.nrows(),
            });
        }
        let dim = self.train_groups[0].dim();
        if let Some(bad) = self.train_groups.iter().find(|g| g.dim() != dim) {
            return Err(SDMError::DimensionMismatch {
                expected: dim,
                actual: bad.dim(),
            });
        }

        Ok(TrainedSDM::from_parts(
            self.kernel,
            self.c,
            self.cv_score,
            self.solver_model,
            self.gram,
            self.train_groups,
            divergence,
            self.symmetrize,
        ))
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SDMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SDMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SDMError::IoError)?;
        let reader = BufReader::new(file);
        let model = serde_json::from_reader(reader)
            .map_err(|e| SDMError::SerializationError(e.to_string()))?;
        Ok(model)
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== SDM Model Summary ===");
        println!("Kernel: {}", self.metadata.kernel_name);
        println!("C: {}", self.c);
        match self.cv_score {
            Some(score) => println!("CV Accuracy: {:.2}%", score * 100.0),
            None => println!("CV Accuracy: not evaluated"),
        }
        println!("Training Groups: {}", self.metadata.n_train_groups);
        println!("Classes: {:?}", self.metadata.classes);
        println!("Support Vectors: {}", self.metadata.n_support_vectors);
        println!(
            "Probability Estimates: {}",
            if self.solver_model.has_probability() {
                "yes"
            } else {
                "no"
            }
        );
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SDM;
    use crate::divergence::GaussianL2Divergence;
    use crate::kernel::GaussianKernelGroup;
    use approx::assert_abs_diff_eq;
    use tempfile::NamedTempFile;

    fn trained() -> TrainedSDM<GaussianKernel, GaussianL2Divergence, OneVsOneModel> {
        let groups: Vec<Group> = [0.0, 0.2, 2.0, 2.2]
            .iter()
            .map(|&c| Group::from_scalars(&[c - 0.1, c, c + 0.15]).unwrap())
            .collect();
        SDM::new(
            GaussianKernelGroup::new(vec![1.0], false),
            GaussianL2Divergence::new(),
        )
        .with_c_values(vec![1.0])
        .train(&groups, &[4, 4, 9, 9])
        .unwrap()
    }

    #[test]
    fn test_model_serialization() -> Result<()> {
        let model = trained();
        let serializable = SerializableModel::from_trained(&model);
        assert_eq!(serializable.metadata.classes, vec![4, 9]);
        assert_eq!(serializable.metadata.n_train_groups, 4);
        assert_eq!(serializable.metadata.kernel_name, "gaussian(sigma=1)");

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        serializable.save_to_file(temp_file.path())?;

        let loaded: SerializableModel = SerializableModel::load_from_file(temp_file.path())?;
        assert_eq!(loaded.kernel, serializable.kernel);
        assert_eq!(loaded.c, 1.0);
        assert_eq!(loaded.cv_score, None);
        assert_eq!(loaded.train_groups.len(), 4);
        assert_eq!(loaded.gram.shape(), (4, 4));
        assert_abs_diff_eq!(loaded.gram, *model.gram(), epsilon = 1e-12);

        let restored = loaded.into_trained(GaussianL2Divergence::new())?;
        let test = vec![Group::from_scalars(&[2.1, 1.9, 2.05])?];
        let (original_labels, original_values) = model.predict(&test)?;
        let (restored_labels, restored_values) = restored.predict(&test)?;
        assert_eq!(original_labels, restored_labels);
        assert_abs_diff_eq!(original_values[0][0], restored_values[0][0], epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_into_trained_rejects_inconsistent_model() {
        let mut serializable = SerializableModel::from_trained(&trained());
        serializable.train_groups.pop();
        assert!(matches!(
            serializable.into_trained(GaussianL2Divergence::new()),
            Err(SDMError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_into_trained_rejects_mismatched_gram() {
        let mut serializable = SerializableModel::from_trained(&trained());
        serializable.gram = DMatrix::identity(3, 3);
        assert!(matches!(
            serializable.into_trained(GaussianL2Divergence::new()),
            Err(SDMError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_load_missing_and_corrupt_files() {
        let missing: Result<SerializableModel> =
            SerializableModel::load_from_file("/nonexistent/model.json");
        assert!(matches!(missing, Err(SDMError::IoError(_))));

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(temp_file.path(), "{ not json").expect("Failed to write temp file");
        let corrupt: Result<SerializableModel> =
            SerializableModel::load_from_file(temp_file.path());
        assert!(matches!(corrupt, Err(SDMError::SerializationError(_))));
    }
}
