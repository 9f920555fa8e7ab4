//! Support vector machine screening models for diabetes, heart disease and
//! Parkinson's disease
//!
//! The crate trains one SMO-based classifier per disease from a tabular
//! dataset, persists each model with its feature scaler, and serves
//! predictions over HTTP.

pub mod api;
pub mod cache;
pub mod classifier;
pub mod core;
pub mod data;
pub mod disease;
pub mod kernel;
pub mod metrics;
pub mod persistence;
pub mod pipeline;
pub mod scaling;
pub mod service;
pub mod solver;

// Re-export main types for convenience
pub use crate::classifier::{ModelInfo, TrainedSVM, SVM};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{DiagnosisError, Result};
pub use crate::data::TabularDataset;
pub use crate::disease::{Disease, DiseaseConfig, ScalerFit};
pub use crate::kernel::{Kernel, KernelKind, KernelType};
pub use crate::metrics::EvaluationMetrics;
pub use crate::persistence::{ModelPair, ModelStore};
pub use crate::pipeline::{PipelineConfig, TrainingPipeline, TrainingReport};
pub use crate::scaling::ScalerParams;
pub use crate::service::{ModelRegistry, PredictionService};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
