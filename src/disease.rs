//! The three supported diseases and their dataset schemas

use crate::core::DiagnosisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which rows the feature scaler is fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerFit {
    /// Every row, before the split
    FullDataset,
    /// Training rows only
    TrainingSplit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Diabetes,
    Heart,
    Parkinsons,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Diabetes, Disease::Heart, Disease::Parkinsons];

    /// Identifier used in artifact names and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::Heart => "heart",
            Disease::Parkinsons => "parkinsons",
        }
    }

    pub fn config(&self) -> &'static DiseaseConfig {
        match self {
            Disease::Diabetes => &DIABETES,
            Disease::Heart => &HEART,
            Disease::Parkinsons => &PARKINSONS,
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disease {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diabetes" => Ok(Disease::Diabetes),
            "heart" => Ok(Disease::Heart),
            "parkinsons" => Ok(Disease::Parkinsons),
            _ => Err(DiagnosisError::UnknownDisease(s.to_string())),
        }
    }
}

/// Static description of one disease's dataset and messages
#[derive(Debug)]
pub struct DiseaseConfig {
    /// Human-readable name used in messages
    pub display_name: &'static str,
    /// File name inside the data directory
    pub dataset_file: &'static str,
    pub label_column: &'static str,
    /// Identifier columns removed before building feature vectors
    pub drop_columns: &'static [&'static str],
    /// Canonical feature order, as CSV headers
    pub feature_columns: &'static [&'static str],
    /// Request field names, index-aligned with `feature_columns`
    pub json_fields: &'static [&'static str],
    pub scaler_fit: ScalerFit,
    pub negative_message: &'static str,
    pub positive_message: &'static str,
}

impl DiseaseConfig {
    pub fn n_features(&self) -> usize {
        self.feature_columns.len()
    }

    /// Message shown for a predicted label
    pub fn message(&self, label: u8) -> &'static str {
        if label == 1 {
            self.positive_message
        } else {
            self.negative_message
        }
    }
}

static DIABETES: DiseaseConfig = DiseaseConfig {
    display_name: "Diabetes",
    dataset_file: "diabetes.csv",
    label_column: "Outcome",
    drop_columns: &[],
    feature_columns: &[
        "Pregnancies",
        "Glucose",
        "BloodPressure",
        "SkinThickness",
        "Insulin",
        "BMI",
        "DiabetesPedigreeFunction",
        "Age",
    ],
    json_fields: &[
        "pregnancies",
        "glucose",
        "bloodPressure",
        "skinThickness",
        "insulin",
        "bmi",
        "diabetesPedigreeFunction",
        "age",
    ],
    scaler_fit: ScalerFit::FullDataset,
    negative_message: "The person is not diabetic. Continue maintaining a healthy lifestyle.",
    positive_message: "The person is diabetic. Please consult with a healthcare professional for proper management.",
};

static HEART: DiseaseConfig = DiseaseConfig {
    display_name: "Heart disease",
    dataset_file: "heart.csv",
    label_column: "target",
    drop_columns: &[],
    feature_columns: &[
        "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
        "slope", "ca", "thal",
    ],
    json_fields: &[
        "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
        "slope", "ca", "thal",
    ],
    scaler_fit: ScalerFit::FullDataset,
    negative_message:
        "The person does not have heart disease. Continue maintaining cardiovascular health.",
    positive_message: "The person has heart disease. Please consult with a cardiologist for proper evaluation and treatment.",
};

static PARKINSONS: DiseaseConfig = DiseaseConfig {
    display_name: "Parkinson's disease",
    dataset_file: "parkinsons.csv",
    label_column: "status",
    drop_columns: &["name"],
    feature_columns: &[
        "MDVP:Fo(Hz)",
        "MDVP:Fhi(Hz)",
        "MDVP:Flo(Hz)",
        "MDVP:Jitter(%)",
        "MDVP:Jitter(Abs)",
        "MDVP:RAP",
        "MDVP:PPQ",
        "Jitter:DDP",
        "MDVP:Shimmer",
        "MDVP:Shimmer(dB)",
        "Shimmer:APQ3",
        "Shimmer:APQ5",
        "MDVP:APQ",
        "Shimmer:DDA",
        "NHR",
        "HNR",
        "RPDE",
        "DFA",
        "spread1",
        "spread2",
        "D2",
        "PPE",
    ],
    json_fields: &[
        "mdvpFo",
        "mdvpFhi",
        "mdvpFlo",
        "mdvpJitter",
        "mdvpJitterAbs",
        "mdvpRap",
        "mdvpPpq",
        "jitterDdp",
        "mdvpShimmer",
        "mdvpShimmerDb",
        "shimmerApq3",
        "shimmerApq5",
        "mdvpApq",
        "shimmerDda",
        "nhr",
        "hnr",
        "rpde",
        "dfa",
        "spread1",
        "spread2",
        "d2",
        "ppe",
    ],
    scaler_fit: ScalerFit::TrainingSplit,
    negative_message:
        "The person does not have Parkinson's disease. Continue monitoring neurological health.",
    positive_message: "The person has Parkinson's disease. Please consult with a neurologist for proper evaluation and treatment.",
};
