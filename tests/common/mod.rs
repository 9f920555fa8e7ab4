//! Synthetic datasets with the real column layouts
//!
//! Values come from a fixed LCG and labels from a linear rule on a few
//! clinically plausible columns, so every dataset is reproducible and
//! linearly separable.

#![allow(dead_code)]

use medsvm::{Disease, PipelineConfig, TrainingPipeline, TrainingReport};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const DIABETES_EXAMPLE: [f64; 8] = [4.0, 110.0, 92.0, 0.0, 0.0, 37.6, 0.191, 30.0];
pub const HEART_EXAMPLE: [f64; 13] = [
    57.0, 1.0, 0.0, 140.0, 192.0, 0.0, 1.0, 148.0, 0.0, 0.4, 1.0, 0.0, 1.0,
];

struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// (column, low, high, weight in the labelling rule)
type Column = (&'static str, f64, f64, f64);

const DIABETES_COLUMNS: &[Column] = &[
    ("Pregnancies", 0.0, 12.0, 0.0),
    ("Glucose", 60.0, 200.0, 1.0 / 35.0),
    ("BloodPressure", 40.0, 110.0, 0.0),
    ("SkinThickness", 0.0, 50.0, 0.0),
    ("Insulin", 0.0, 300.0, 0.0),
    ("BMI", 18.0, 50.0, 1.0 / 8.0),
    ("DiabetesPedigreeFunction", 0.1, 2.0, 0.0),
    ("Age", 21.0, 80.0, 1.0 / 60.0),
];

const HEART_COLUMNS: &[Column] = &[
    ("age", 29.0, 77.0, 0.0),
    ("sex", 0.0, 1.0, 0.0),
    ("cp", 0.0, 3.0, 1.0),
    ("trestbps", 94.0, 200.0, 0.0),
    ("chol", 126.0, 564.0, 0.0),
    ("fbs", 0.0, 1.0, 0.0),
    ("restecg", 0.0, 2.0, 0.0),
    ("thalach", 71.0, 202.0, 1.0 / 30.0),
    ("exang", 0.0, 1.0, 0.0),
    ("oldpeak", 0.0, 6.2, -1.0),
    ("slope", 0.0, 2.0, 0.0),
    ("ca", 0.0, 4.0, 0.0),
    ("thal", 0.0, 3.0, 0.0),
];

const PARKINSONS_COLUMNS: &[Column] = &[
    ("MDVP:Fo(Hz)", 88.0, 260.0, 0.0),
    ("MDVP:Fhi(Hz)", 102.0, 592.0, 0.0),
    ("MDVP:Flo(Hz)", 65.0, 239.0, 0.0),
    ("MDVP:Jitter(%)", 0.0017, 0.033, 0.0),
    ("MDVP:Jitter(Abs)", 0.000007, 0.00026, 0.0),
    ("MDVP:RAP", 0.00068, 0.0214, 0.0),
    ("MDVP:PPQ", 0.00092, 0.0196, 0.0),
    ("Jitter:DDP", 0.002, 0.064, 0.0),
    ("MDVP:Shimmer", 0.0095, 0.119, 0.0),
    ("MDVP:Shimmer(dB)", 0.085, 1.3, 0.0),
    ("Shimmer:APQ3", 0.0045, 0.056, 0.0),
    ("Shimmer:APQ5", 0.0057, 0.079, 0.0),
    ("MDVP:APQ", 0.0072, 0.137, 0.0),
    ("Shimmer:DDA", 0.0136, 0.169, 0.0),
    ("NHR", 0.00065, 0.315, 0.0),
    ("HNR", 8.4, 33.0, -1.0 / 6.0),
];

const PARKINSONS_TAIL: &[Column] = &[
    ("RPDE", 0.25, 0.69, 0.0),
    ("DFA", 0.57, 0.83, 0.0),
    ("spread1", -7.96, -2.43, 1.0 / 1.4),
    ("spread2", 0.006, 0.45, 0.0),
    ("D2", 1.42, 3.67, 0.0),
    ("PPE", 0.044, 0.53, 1.0 / 0.12),
];

fn centre(columns: &[Column]) -> f64 {
    columns
        .iter()
        .map(|&(_, lo, hi, w)| w * (lo + hi) / 2.0)
        .sum()
}

fn sample_row(rng: &mut Lcg, columns: &[Column]) -> (Vec<f64>, f64) {
    let mut score = 0.0;
    let values = columns
        .iter()
        .map(|&(_, lo, hi, w)| {
            let v = lo + (hi - lo) * rng.next_unit();
            let v = (v * 1e4).round() / 1e4;
            score += w * v;
            v
        })
        .collect();
    (values, score)
}

fn header(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.0)
        .collect::<Vec<_>>()
        .join(",")
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// CSV text for `disease` with `n_rows` rows
pub fn dataset_csv(disease: Disease, n_rows: usize) -> String {
    let mut rng = Lcg(match disease {
        Disease::Diabetes => 11,
        Disease::Heart => 23,
        Disease::Parkinsons => 37,
    });
    let mut out = String::new();

    match disease {
        Disease::Diabetes | Disease::Heart => {
            let (columns, label) = if disease == Disease::Diabetes {
                (DIABETES_COLUMNS, "Outcome")
            } else {
                (HEART_COLUMNS, "target")
            };
            let threshold = centre(columns);
            let _ = writeln!(out, "{},{label}", header(columns));
            for _ in 0..n_rows {
                let (values, score) = sample_row(&mut rng, columns);
                let y = u8::from(score > threshold);
                let _ = writeln!(out, "{},{y}", join(&values));
            }
        }
        Disease::Parkinsons => {
            let threshold = centre(PARKINSONS_COLUMNS) + centre(PARKINSONS_TAIL);
            let _ = writeln!(
                out,
                "name,{},status,{}",
                header(PARKINSONS_COLUMNS),
                header(PARKINSONS_TAIL)
            );
            for i in 0..n_rows {
                let (head, s1) = sample_row(&mut rng, PARKINSONS_COLUMNS);
                let (tail, s2) = sample_row(&mut rng, PARKINSONS_TAIL);
                let y = u8::from(s1 + s2 > threshold);
                let _ = writeln!(
                    out,
                    "phon_R01_S{:02}_{},{},{y},{}",
                    i / 6,
                    i % 6 + 1,
                    join(&head),
                    join(&tail)
                );
            }
        }
    }
    out
}

/// Write all three datasets into `dir`
pub fn write_datasets(dir: &Path, n_rows: usize) -> PathBuf {
    fs::create_dir_all(dir).expect("create data dir");
    for disease in Disease::ALL {
        let path = dir.join(disease.config().dataset_file);
        fs::write(&path, dataset_csv(disease, n_rows)).expect("write dataset");
    }
    dir.to_path_buf()
}

pub fn config(data_dir: &Path, model_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        model_dir: model_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

/// Train and persist one disease into `model_dir`
pub fn train(disease: Disease, data_dir: &Path, model_dir: &Path) -> TrainingReport {
    TrainingPipeline::new(disease, config(data_dir, model_dir))
        .run()
        .expect("training should succeed")
}

/// Datasets and models for every disease under one root
pub fn trained_workspace(root: &Path) -> (PathBuf, PathBuf) {
    let data_dir = write_datasets(&root.join("dataset"), 150);
    let model_dir = root.join("models");
    for disease in Disease::ALL {
        train(disease, &data_dir, &model_dir);
    }
    (data_dir, model_dir)
}
