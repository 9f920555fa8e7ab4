//! End-to-end training pipeline tests on synthetic datasets

mod common;

use approx::assert_relative_eq;
use medsvm::pipeline::PipelineStage;
use medsvm::{
    DiagnosisError, Disease, ModelStore, PipelineConfig, PredictionService, ScalerFit,
    ScalerParams, TrainingPipeline,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_stages_run_in_order() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 120);
    let report = common::train(Disease::Diabetes, &data_dir, &root.path().join("models"));

    assert_eq!(
        report.stages,
        vec![
            PipelineStage::Loaded,
            PipelineStage::Scaled,
            PipelineStage::Split,
            PipelineStage::Fitted,
            PipelineStage::Evaluated,
            PipelineStage::Persisted,
        ]
    );
    assert_eq!(report.n_samples, 120);
    assert_eq!(report.n_train + report.n_test, 120);
    assert_eq!(report.n_test, 24);
    assert!(report.artifacts.scaler_path.exists());
    assert!(report.artifacts.model_path.exists());
}

#[test]
fn test_all_diseases_learn_their_rule() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 150);

    for disease in Disease::ALL {
        let report = common::train(disease, &data_dir, &root.path().join("models"));
        assert!(
            report.train_accuracy >= 0.8,
            "{disease}: train accuracy {}",
            report.train_accuracy
        );
        assert!(
            report.test_accuracy >= 0.7,
            "{disease}: test accuracy {}",
            report.test_accuracy
        );
        assert!(report.n_support_vectors > 0);
        assert_eq!(report.test_metrics.total(), report.n_test);
    }
}

#[test]
fn test_same_seed_same_result() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 120);

    let first = common::train(Disease::Heart, &data_dir, &root.path().join("run1"));
    let second = common::train(Disease::Heart, &data_dir, &root.path().join("run2"));
    assert_eq!(first.test_accuracy, second.test_accuracy);
    assert_eq!(first.train_accuracy, second.train_accuracy);

    let a = ModelStore::new(root.path().join("run1"))
        .load(Disease::Heart)
        .unwrap();
    let b = ModelStore::new(root.path().join("run2"))
        .load(Disease::Heart)
        .unwrap();
    assert_eq!(a.scaler, b.scaler);
    assert_eq!(a.model, b.model);
    assert_ne!(a.metadata.pair_id, b.metadata.pair_id);
}

#[test]
fn test_diabetes_example_prediction_is_stable() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 150);

    let mut labels = Vec::new();
    for run in ["a", "b"] {
        let model_dir = root.path().join(run);
        common::train(Disease::Diabetes, &data_dir, &model_dir);
        let service = PredictionService::from_store(ModelStore::new(&model_dir));
        let result = service
            .predict_vector(Disease::Diabetes, &common::DIABETES_EXAMPLE)
            .unwrap();
        assert_relative_eq!(result.confidence, 0.85);
        labels.push(result.prediction);
    }
    assert_eq!(labels[0], labels[1]);
}

#[test]
fn test_permuted_features_change_prediction() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 150);
    let model_dir = root.path().join("models");
    common::train(Disease::Diabetes, &data_dir, &model_dir);
    let service = PredictionService::from_store(ModelStore::new(&model_dir));

    let canonical = [4.0, 80.0, 92.0, 0.0, 200.0, 34.0, 0.191, 30.0];
    // glucose and insulin swapped
    let permuted = [4.0, 200.0, 92.0, 0.0, 80.0, 34.0, 0.191, 30.0];

    let a = service.predict_vector(Disease::Diabetes, &canonical).unwrap();
    let b = service.predict_vector(Disease::Diabetes, &permuted).unwrap();
    assert_eq!(a.prediction, 0);
    assert_eq!(b.prediction, 1);
}

#[test]
fn test_scaler_policy_controls_fit_rows() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 120);
    let full_means = {
        let pipeline = TrainingPipeline::new(
            Disease::Parkinsons,
            common::config(&data_dir, &root.path().join("unused")),
        );
        let dataset = pipeline.load_dataset().unwrap();
        ScalerParams::fit(dataset.rows()).unwrap().means
    };

    // parkinsons fits on the training split by default
    let split_dir = root.path().join("split");
    common::train(Disease::Parkinsons, &data_dir, &split_dir);
    let split_pair = ModelStore::new(&split_dir).load(Disease::Parkinsons).unwrap();
    assert_ne!(split_pair.scaler.means, full_means);

    let full_dir = root.path().join("full");
    let config = PipelineConfig {
        scaler_fit: Some(ScalerFit::FullDataset),
        ..common::config(&data_dir, &full_dir)
    };
    TrainingPipeline::new(Disease::Parkinsons, config).run().unwrap();
    let full_pair = ModelStore::new(&full_dir).load(Disease::Parkinsons).unwrap();
    assert_eq!(full_pair.scaler.means, full_means);
}

#[test]
fn test_compare_kernels_persists_nothing() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 100);
    let model_dir = root.path().join("models");

    let pipeline = TrainingPipeline::new(Disease::Heart, common::config(&data_dir, &model_dir));
    let rows = pipeline.compare_kernels().unwrap();

    let kernels: Vec<String> = rows.iter().map(|r| r.kernel.to_string()).collect();
    assert_eq!(kernels, ["linear", "poly", "rbf", "sigmoid"]);
    for row in &rows {
        assert!((0.0..=1.0).contains(&row.test_accuracy));
        assert!((0.0..=1.0).contains(&row.train_accuracy));
    }
    assert!(!model_dir.exists());
}

#[test]
fn test_rescore_whole_dataset() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 150);
    let model_dir = root.path().join("models");
    common::train(Disease::Diabetes, &data_dir, &model_dir);

    let pair = ModelStore::new(&model_dir).load(Disease::Diabetes).unwrap();
    let pipeline = TrainingPipeline::new(Disease::Diabetes, common::config(&data_dir, &model_dir));
    let report = pipeline.rescore(&pair).unwrap();

    assert_eq!(report.predictions.len(), 150);
    assert_eq!(report.metrics.total(), 150);
    assert!(report.metrics.accuracy() >= 0.75);
}

#[test]
fn test_non_finite_cell_keeps_previous_pair() {
    let root = TempDir::new().unwrap();
    let data_dir = common::write_datasets(&root.path().join("dataset"), 80);
    let model_dir = root.path().join("models");
    let good = common::train(Disease::Diabetes, &data_dir, &model_dir);

    let mut csv = common::dataset_csv(Disease::Diabetes, 80);
    csv.push_str("2,120,70,20,NaN,30.5,0.4,40,1\n");
    fs::write(data_dir.join("diabetes.csv"), csv).unwrap();

    let config = common::config(&data_dir, &model_dir);
    match TrainingPipeline::new(Disease::Diabetes, config).run() {
        Err(DiagnosisError::ParseError(msg)) => assert!(msg.contains("Insulin"), "{msg}"),
        other => panic!("expected parse error, got {other:?}"),
    }

    let pair = ModelStore::new(&model_dir).load(Disease::Diabetes).unwrap();
    assert_eq!(pair.metadata.pair_id, good.artifacts.pair_id);
}

#[test]
fn test_malformed_dataset_aborts_without_artifacts() {
    let root = TempDir::new().unwrap();
    let data_dir = root.path().join("dataset");
    fs::create_dir_all(&data_dir).unwrap();
    let mut csv = common::dataset_csv(Disease::Diabetes, 40);
    csv.push_str("1,2,3,4,5,6,7,8,9\n");
    fs::write(data_dir.join("diabetes.csv"), csv).unwrap();

    let model_dir = root.path().join("models");
    let result = TrainingPipeline::new(Disease::Diabetes, common::config(&data_dir, &model_dir)).run();
    assert!(result.is_err());
    assert!(!ModelStore::new(&model_dir).exists(Disease::Diabetes));
}
