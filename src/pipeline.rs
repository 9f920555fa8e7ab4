//! Training pipeline: one implementation, parameterised by disease
//!
//! A run moves through `Loaded → Scaled → Split → Fitted → Evaluated →
//! Persisted` exactly once. Any error aborts the run before anything is
//! written, since persistence is the final stage.
//!
//! The train/test partition is planned from the labels right after loading,
//! so a scaler fitted on the training split sees the same rows that are
//! later used for fitting.

use crate::classifier::{TrainedSVM, SVM};
use crate::core::{BinaryClassifier, Dataset, OptimizerConfig, Result};
use crate::data::{stratified_split, SplitPlan, TabularDataset};
use crate::disease::{Disease, ScalerFit};
use crate::kernel::KernelType;
use crate::metrics::EvaluationMetrics;
use crate::persistence::{ModelPair, ModelStore, SavedArtifacts};
use crate::scaling::ScalerParams;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Seed used by every published model
pub const DEFAULT_SEED: u64 = 2;
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `diabetes.csv`, `heart.csv` and `parkinsons.csv`
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    pub seed: u64,
    pub test_ratio: f64,
    pub kernel: KernelType,
    pub optimizer: OptimizerConfig,
    /// Fit Platt calibration so predictions carry probabilities
    pub probability: bool,
    /// Overrides the disease's own scaler policy when set
    pub scaler_fit: Option<ScalerFit>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("dataset"),
            model_dir: PathBuf::from("models"),
            seed: DEFAULT_SEED,
            test_ratio: DEFAULT_TEST_RATIO,
            kernel: KernelType::Linear,
            optimizer: OptimizerConfig::default(),
            probability: false,
            scaler_fit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Loaded,
    Scaled,
    Split,
    Fitted,
    Evaluated,
    Persisted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a completed training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub disease: Disease,
    pub kernel: KernelType,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub test_metrics: EvaluationMetrics,
    pub n_support_vectors: usize,
    pub artifacts: SavedArtifacts,
    pub stages: Vec<PipelineStage>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ({} kernel) ===", self.disease, self.kernel)?;
        writeln!(
            f,
            "samples: {} (train {}, test {})",
            self.n_samples, self.n_train, self.n_test
        )?;
        writeln!(f, "support vectors: {}", self.n_support_vectors)?;
        writeln!(f, "training accuracy: {:.4}", self.train_accuracy)?;
        writeln!(f, "test accuracy: {:.4}", self.test_accuracy)?;
        writeln!(f)?;
        writeln!(f, "{}", self.test_metrics)?;
        writeln!(f)?;
        writeln!(f, "scaler: {}", self.artifacts.scaler_path.display())?;
        write!(f, "model:  {}", self.artifacts.model_path.display())
    }
}

/// One row of a kernel comparison
#[derive(Debug, Clone, Serialize)]
pub struct KernelComparison {
    pub kernel: KernelType,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub test_metrics: EvaluationMetrics,
    pub n_support_vectors: usize,
}

/// Predicted vs actual labels for every dataset row
#[derive(Debug, Clone, Serialize)]
pub struct RescoreReport {
    pub disease: Disease,
    pub predictions: Vec<(u8, u8)>,
    pub metrics: EvaluationMetrics,
}

/// Scaled data ready for fitting
struct Prepared {
    n_samples: usize,
    scaler: ScalerParams,
    train: TabularDataset,
    test: TabularDataset,
    stages: Vec<PipelineStage>,
}

pub struct TrainingPipeline {
    disease: Disease,
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(disease: Disease, config: PipelineConfig) -> Self {
        Self { disease, config }
    }

    pub fn disease(&self) -> Disease {
        self.disease
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn scaler_fit(&self) -> ScalerFit {
        self.config
            .scaler_fit
            .unwrap_or(self.disease.config().scaler_fit)
    }

    /// Read the disease's CSV with columns in canonical order
    pub fn load_dataset(&self) -> Result<TabularDataset> {
        let schema = self.disease.config();
        let path = self.config.data_dir.join(schema.dataset_file);
        TabularDataset::from_file(path, schema.label_column, schema.drop_columns)?
            .with_feature_order(schema.feature_columns)
    }

    fn svm(&self, kernel: KernelType) -> SVM {
        SVM::new()
            .with_kernel(kernel)
            .with_config(self.config.optimizer.clone())
            .with_probability(self.config.probability)
    }

    fn prepare(&self) -> Result<Prepared> {
        let mut stages = Vec::with_capacity(6);

        let dataset = self.load_dataset()?;
        let (neg, pos) = dataset.class_counts();
        info!(
            "{}: loaded {} rows ({} negative, {} positive)",
            self.disease,
            dataset.len(),
            neg,
            pos
        );
        stages.push(PipelineStage::Loaded);

        let plan: SplitPlan =
            stratified_split(&dataset.labels(), self.config.test_ratio, self.config.seed)?;

        let scaler = match self.scaler_fit() {
            ScalerFit::FullDataset => ScalerParams::fit(dataset.rows())?,
            ScalerFit::TrainingSplit => ScalerParams::fit(dataset.subset(&plan.train).rows())?,
        };
        let scaled = dataset.map_rows(|row| scaler.transform(row))?;
        info!("{}: scaled features ({:?})", self.disease, self.scaler_fit());
        stages.push(PipelineStage::Scaled);

        let train = scaled.subset(&plan.train);
        let test = scaled.subset(&plan.test);
        info!(
            "{}: split {} train / {} test (seed {})",
            self.disease,
            train.len(),
            test.len(),
            self.config.seed
        );
        stages.push(PipelineStage::Split);

        Ok(Prepared {
            n_samples: dataset.len(),
            scaler,
            train,
            test,
            stages,
        })
    }

    /// Run every stage and persist the resulting pair
    pub fn run(&self) -> Result<TrainingReport> {
        let Prepared {
            n_samples,
            scaler,
            train,
            test,
            mut stages,
        } = self.prepare()?;

        let model = self.svm(self.config.kernel).train(&train)?;
        stages.push(PipelineStage::Fitted);

        let train_accuracy = model.evaluate(&train);
        let test_metrics = model.evaluate_detailed(&test);
        info!(
            "{}: train accuracy {:.4}, test accuracy {:.4}",
            self.disease,
            train_accuracy,
            test_metrics.accuracy()
        );
        stages.push(PipelineStage::Evaluated);

        let store = ModelStore::new(&self.config.model_dir);
        let artifacts = store.save(self.disease, &scaler, &model)?;
        stages.push(PipelineStage::Persisted);

        Ok(TrainingReport {
            disease: self.disease,
            kernel: self.config.kernel,
            n_samples,
            n_train: train.len(),
            n_test: test.len(),
            train_accuracy,
            test_accuracy: test_metrics.accuracy(),
            test_metrics,
            n_support_vectors: model.n_support_vectors(),
            artifacts,
            stages,
        })
    }

    /// Train one model per kernel family on the same split, persisting nothing
    pub fn compare_kernels(&self) -> Result<Vec<KernelComparison>> {
        let prepared = self.prepare()?;
        KernelType::ALL
            .iter()
            .map(|&kernel| {
                let model: TrainedSVM = self.svm(kernel).train(&prepared.train)?;
                let test_metrics = model.evaluate_detailed(&prepared.test);
                info!(
                    "{}: {kernel} kernel test accuracy {:.4}",
                    self.disease,
                    test_metrics.accuracy()
                );
                Ok(KernelComparison {
                    kernel,
                    train_accuracy: model.evaluate(&prepared.train),
                    test_accuracy: test_metrics.accuracy(),
                    test_metrics,
                    n_support_vectors: model.n_support_vectors(),
                })
            })
            .collect()
    }

    /// Score every dataset row with a persisted pair
    pub fn rescore(&self, pair: &ModelPair) -> Result<RescoreReport> {
        let dataset = self.load_dataset()?;
        let scaled = pair.scaler.transform_batch(dataset.rows())?;
        let predictions: Vec<(u8, u8)> = pair
            .model
            .predict_batch(&scaled)
            .iter()
            .zip(dataset.labels())
            .map(|(p, actual)| (p.label, actual))
            .collect();

        let (predicted, actual): (Vec<u8>, Vec<u8>) = predictions.iter().copied().unzip();
        Ok(RescoreReport {
            disease: self.disease,
            metrics: EvaluationMetrics::from_labels(&predicted, &actual),
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.seed, 2);
        assert_eq!(config.test_ratio, 0.2);
        assert_eq!(config.kernel, KernelType::Linear);
        assert!(!config.probability);
        assert!(config.scaler_fit.is_none());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"seed": 7, "kernel": "rbf"}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.kernel, KernelType::Rbf);
        assert_eq!(config.test_ratio, DEFAULT_TEST_RATIO);
    }

    #[test]
    fn test_scaler_policy_override() {
        let pipeline = TrainingPipeline::new(Disease::Parkinsons, PipelineConfig::default());
        assert_eq!(pipeline.scaler_fit(), ScalerFit::TrainingSplit);

        let config = PipelineConfig {
            scaler_fit: Some(ScalerFit::FullDataset),
            ..PipelineConfig::default()
        };
        let pipeline = TrainingPipeline::new(Disease::Parkinsons, config);
        assert_eq!(pipeline.scaler_fit(), ScalerFit::FullDataset);
    }

    #[test]
    fn test_missing_dataset_aborts_before_persisting() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PipelineConfig {
            data_dir: dir.path().join("absent"),
            model_dir: dir.path().join("models"),
            ..PipelineConfig::default()
        };
        let result = TrainingPipeline::new(Disease::Heart, config).run();
        assert!(matches!(
            result,
            Err(crate::core::DiagnosisError::SourceMissing(_))
        ));
        assert!(!dir.path().join("models").exists());
    }
}
