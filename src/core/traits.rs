//! Core traits shared by datasets and classifiers

use crate::core::{Prediction, Sample};

/// Dataset abstraction over rows of dense feature vectors
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Feature vector of row `i`
    ///
    /// # Panics
    /// Panics if index >= len()
    fn row(&self, i: usize) -> &[f64];

    /// 0/1 label of row `i`
    fn label(&self, i: usize) -> u8;

    /// Get all labels as a vector
    fn labels(&self) -> Vec<u8> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }

    /// Build a solver sample for row `i`
    fn get_sample(&self, i: usize) -> Sample {
        Sample::from_binary(self.row(i).to_vec(), self.label(i))
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fitted binary classifier over scaled feature vectors
pub trait BinaryClassifier: Send + Sync {
    /// Predict a single feature vector
    fn predict(&self, features: &[f64]) -> Prediction;

    /// Predict multiple feature vectors
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<Prediction> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    /// Class probabilities `[p0, p1]`, when the model was calibrated
    fn predict_proba(&self, features: &[f64]) -> Option<[f64; 2]>;

    /// Number of features the model expects
    fn n_features(&self) -> usize;
}
