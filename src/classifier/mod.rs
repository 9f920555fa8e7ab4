//! Support vector classifier: training builder and fitted model
//!
//! ```rust,no_run
//! use medsvm::classifier::SVM;
//! use medsvm::kernel::KernelType;
//! # use medsvm::core::Sample;
//! # fn main() -> medsvm::core::Result<()> {
//! # let samples: Vec<Sample> = Vec::new();
//! let model = SVM::new()
//!     .with_kernel(KernelType::Rbf)
//!     .with_c(1.0)
//!     .train_samples(&samples)?;
//!
//! let prediction = model.decision_function(&[0.3, -1.2]);
//! # Ok(())
//! # }
//! ```

pub mod platt;

pub use self::platt::PlattScaling;

use crate::core::{
    to_binary, BinaryClassifier, Dataset, DiagnosisError, OptimizationResult, OptimizerConfig,
    Prediction, Result, Sample,
};
use crate::kernel::{Kernel, KernelKind, KernelType};
use crate::metrics::EvaluationMetrics;
use crate::solver::SMOSolver;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum KernelChoice {
    /// Parameters derived from the training data dimension
    Auto(KernelType),
    Fixed(KernelKind),
}

/// SVM trainer with builder-style configuration
#[derive(Debug, Clone)]
pub struct SVM {
    kernel: KernelChoice,
    config: OptimizerConfig,
    probability: bool,
}

impl SVM {
    /// Linear kernel, default optimizer settings, no calibration
    pub fn new() -> Self {
        Self {
            kernel: KernelChoice::Auto(KernelType::Linear),
            config: OptimizerConfig::default(),
            probability: false,
        }
    }

    /// Use a kernel family with `auto` parameters
    pub fn with_kernel(mut self, kernel_type: KernelType) -> Self {
        self.kernel = KernelChoice::Auto(kernel_type);
        self
    }

    /// Use a fully parameterised kernel
    pub fn with_kernel_params(mut self, kernel: KernelKind) -> Self {
        self.kernel = KernelChoice::Fixed(kernel);
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    /// Replace the whole optimizer configuration
    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Fit a Platt sigmoid after training so `predict_proba` is available
    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Train on every row of a dataset
    pub fn train<D: Dataset>(&self, dataset: &D) -> Result<TrainedSVM> {
        let samples: Vec<Sample> = (0..dataset.len()).map(|i| dataset.get_sample(i)).collect();
        self.train_samples(&samples)
    }

    /// Train on solver samples with -1/+1 labels
    pub fn train_samples(&self, samples: &[Sample]) -> Result<TrainedSVM> {
        let n_features = samples.first().map(|s| s.features.len()).unwrap_or(0);
        let kernel = match self.kernel {
            KernelChoice::Auto(kernel_type) => KernelKind::auto(kernel_type, n_features),
            KernelChoice::Fixed(kernel) => kernel,
        };
        kernel.validate()?;

        let solver = SMOSolver::new(Arc::new(kernel), self.config.clone());
        let result = solver.solve(samples)?;
        info!(
            "trained {} kernel: {} support vectors after {} passes",
            kernel.kernel_type(),
            result.support_vectors.len(),
            result.iterations
        );

        let mut model = TrainedSVM::new(kernel, n_features, samples, &result, &self.config);

        if self.probability {
            let decisions: Vec<f64> = samples
                .iter()
                .map(|s| model.decision_function(&s.features))
                .collect();
            let labels: Vec<u8> = samples.iter().map(|s| to_binary(s.label)).collect();
            let platt = PlattScaling::fit(&decisions, &labels)?;
            debug!("platt calibration: a={:.6}, b={:.6}", platt.a, platt.b);
            model.platt = Some(platt);
        }

        Ok(model)
    }
}

impl Default for SVM {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings a model was trained with, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub c: f64,
    pub epsilon: f64,
    pub iterations: usize,
    pub objective_value: f64,
    pub n_training_samples: usize,
}

/// A fitted SVM holding only what prediction needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedSVM {
    kernel: KernelKind,
    n_features: usize,
    support_vectors: Vec<Vec<f64>>,
    /// alpha_i * y_i for each support vector
    dual_coef: Vec<f64>,
    bias: f64,
    platt: Option<PlattScaling>,
    training: TrainingSummary,
}

impl TrainedSVM {
    fn new(
        kernel: KernelKind,
        n_features: usize,
        samples: &[Sample],
        result: &OptimizationResult,
        config: &OptimizerConfig,
    ) -> Self {
        let mut support_vectors = Vec::with_capacity(result.support_vectors.len());
        let mut dual_coef = Vec::with_capacity(result.support_vectors.len());

        for &sv_idx in &result.support_vectors {
            let sample = &samples[sv_idx];
            support_vectors.push(sample.features.clone());
            dual_coef.push(result.alpha[sv_idx] * sample.label);
        }

        Self {
            kernel,
            n_features,
            support_vectors,
            dual_coef,
            bias: result.b,
            platt: None,
            training: TrainingSummary {
                c: config.c,
                epsilon: config.epsilon,
                iterations: result.iterations,
                objective_value: result.objective_value,
                n_training_samples: samples.len(),
            },
        }
    }

    /// Σ α_i y_i K(sv_i, x) + b
    pub fn decision_function(&self, features: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * self.kernel.compute(sv, features))
            .sum::<f64>()
            + self.bias
    }

    /// Check a deserialized model for internal consistency
    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        if self.support_vectors.len() != self.dual_coef.len() {
            return Err(DiagnosisError::InvalidParameter(format!(
                "{} support vectors but {} coefficients",
                self.support_vectors.len(),
                self.dual_coef.len()
            )));
        }
        if let Some(sv) = self
            .support_vectors
            .iter()
            .find(|sv| sv.len() != self.n_features)
        {
            return Err(DiagnosisError::DimensionMismatch {
                expected: self.n_features,
                actual: sv.len(),
            });
        }
        if !self.bias.is_finite() || self.dual_coef.iter().any(|c| !c.is_finite()) {
            return Err(DiagnosisError::InvalidParameter(
                "non-finite model coefficients".to_string(),
            ));
        }
        Ok(())
    }

    pub fn kernel(&self) -> &KernelKind {
        &self.kernel
    }

    pub fn support_vectors(&self) -> &[Vec<f64>] {
        &self.support_vectors
    }

    pub fn dual_coefficients(&self) -> &[f64] {
        &self.dual_coef
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn has_probability(&self) -> bool {
        self.platt.is_some()
    }

    pub fn training_summary(&self) -> &TrainingSummary {
        &self.training
    }

    /// Accuracy over a labelled dataset
    pub fn evaluate<D: Dataset>(&self, dataset: &D) -> f64 {
        self.evaluate_detailed(dataset).accuracy()
    }

    /// Confusion counts over a labelled dataset
    pub fn evaluate_detailed<D: Dataset>(&self, dataset: &D) -> EvaluationMetrics {
        let predicted: Vec<u8> = (0..dataset.len())
            .map(|i| self.predict(dataset.row(i)).label)
            .collect();
        EvaluationMetrics::from_labels(&predicted, &dataset.labels())
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            kernel: self.kernel,
            n_features: self.n_features,
            n_support_vectors: self.n_support_vectors(),
            bias: self.bias,
            probability: self.has_probability(),
            training: self.training.clone(),
        }
    }
}

impl BinaryClassifier for TrainedSVM {
    fn predict(&self, features: &[f64]) -> Prediction {
        let decision_value = self.decision_function(features);
        let label = if decision_value >= 0.0 { 1 } else { 0 };
        Prediction::new(label, decision_value)
    }

    fn predict_proba(&self, features: &[f64]) -> Option<[f64; 2]> {
        let platt = self.platt.as_ref()?;
        let p1 = platt.probability(self.decision_function(features));
        Some([1.0 - p1, p1])
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Model information
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub kernel: KernelKind,
    pub n_features: usize,
    pub n_support_vectors: usize,
    pub bias: f64,
    pub probability: bool,
    pub training: TrainingSummary,
}
