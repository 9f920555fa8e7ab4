//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw classifier output for one feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (0 or 1)
    pub label: u8,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: u8, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }
}

/// Training sample with a dense, fixed-order feature vector
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    /// Class label in solver form (+1 or -1)
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: Vec<f64>, label: f64) -> Self {
        Self { features, label }
    }

    /// Create a sample from a 0/1 dataset label
    pub fn from_binary(features: Vec<f64>, label: u8) -> Self {
        Self::new(features, to_signed(label))
    }
}

/// Map a 0/1 label onto the solver's -1/+1 convention
pub fn to_signed(label: u8) -> f64 {
    if label == 1 {
        1.0
    } else {
        -1.0
    }
}

/// Map a solver label back onto 0/1
pub fn to_binary(label: f64) -> u8 {
    if label > 0.0 {
        1
    } else {
        0
    }
}

/// Result of the dual optimization
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Bias term (b)
    pub b: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of passes performed
    pub iterations: usize,
    /// Final dual objective value
    pub objective_value: f64,
}

/// Configuration for the SMO optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance for KKT conditions
    pub epsilon: f64,
    /// Maximum number of passes over the training set
    pub max_iterations: usize,
    /// Kernel cache size in bytes
    pub cache_size: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 10000,
            cache_size: 64_000_000,
        }
    }
}

/// Coarse risk category attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(name)
    }
}

/// Answer to a single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction: u8,
    pub confidence: f64,
    pub message: String,
    pub risk_level: RiskLevel,
}
