//! Prediction service over lazily loaded artifact pairs
//!
//! The `ModelRegistry` is built once at process start and shared by every
//! request. Each disease has its own one-time initialisation cell, so the
//! first concurrent requests for a disease trigger exactly one load and
//! later requests read the loaded pair without locking. A successful load
//! is never invalidated; a failed one is retried on the next request.

use crate::core::{BinaryClassifier, DiagnosisError, PredictionResult, Result, RiskLevel};
use crate::disease::Disease;
use crate::persistence::{ModelPair, ModelStore};
use log::{debug, error, warn};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Confidence reported when the model has no probability calibration
pub const DEFAULT_CONFIDENCE: f64 = 0.85;
/// A positive prediction above this confidence is high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.8;
/// A negative prediction at or below this confidence is medium risk
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Confidence from class probabilities, or the fixed default without them
pub fn confidence(proba: Option<[f64; 2]>) -> f64 {
    match proba {
        Some([p0, p1]) => p0.max(p1),
        None => DEFAULT_CONFIDENCE,
    }
}

pub fn risk_level(label: u8, confidence: f64) -> RiskLevel {
    if label == 1 {
        if confidence > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    } else if confidence > LOW_CONFIDENCE_THRESHOLD {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

/// Build the canonical feature vector for `disease` from named fields
///
/// Numbers and numeric strings are accepted. Unknown keys are ignored.
pub fn assemble_features(disease: Disease, fields: &Map<String, Value>) -> Result<Vec<f64>> {
    disease
        .config()
        .json_fields
        .iter()
        .map(|&name| {
            let value = fields
                .get(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| DiagnosisError::MissingField(name.to_string()))?;
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            number.filter(|x| x.is_finite()).ok_or_else(|| {
                DiagnosisError::MalformedInput(format!("field '{name}' must be a number"))
            })
        })
        .collect()
}

/// Which diseases currently have a usable artifact pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelsLoaded {
    pub diabetes: bool,
    pub heart: bool,
    pub parkinsons: bool,
}

/// Per-disease cache of loaded artifact pairs
pub struct ModelRegistry {
    store: ModelStore,
    slots: [OnceCell<Arc<ModelPair>>; 3],
}

impl ModelRegistry {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            slots: [OnceCell::new(), OnceCell::new(), OnceCell::new()],
        }
    }

    fn slot(&self, disease: Disease) -> &OnceCell<Arc<ModelPair>> {
        let idx = match disease {
            Disease::Diabetes => 0,
            Disease::Heart => 1,
            Disease::Parkinsons => 2,
        };
        &self.slots[idx]
    }

    /// Loaded pair for `disease`, loading it on first use
    pub fn get(&self, disease: Disease) -> Result<Arc<ModelPair>> {
        self.slot(disease)
            .get_or_try_init(|| {
                debug!(
                    "loading {disease} artifacts from {}",
                    self.store.dir().display()
                );
                self.store.load(disease).map(Arc::new)
            })
            .map(Arc::clone)
    }

    pub fn is_loaded(&self, disease: Disease) -> bool {
        self.slot(disease).get().is_some()
    }

    /// Attempt to load every disease and report which succeeded
    pub fn load_all(&self) -> ModelsLoaded {
        let mut loaded = [false; 3];
        for (flag, disease) in loaded.iter_mut().zip(Disease::ALL) {
            *flag = match self.get(disease) {
                Ok(_) => true,
                Err(e) => {
                    warn!("{disease} model unavailable: {e}");
                    false
                }
            };
        }
        ModelsLoaded {
            diabetes: loaded[0],
            heart: loaded[1],
            parkinsons: loaded[2],
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }
}

/// Answers single-instance prediction requests
pub struct PredictionService {
    registry: ModelRegistry,
}

impl PredictionService {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// Service reading artifacts from `store`
    pub fn from_store(store: ModelStore) -> Self {
        Self::new(ModelRegistry::new(store))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn models_loaded(&self) -> ModelsLoaded {
        self.registry.load_all()
    }

    /// Predict from a map of named request fields
    pub fn predict(
        &self,
        disease: Disease,
        fields: &Map<String, Value>,
    ) -> Result<PredictionResult> {
        let pair = self.pair(disease)?;
        let features = assemble_features(disease, fields)?;
        self.predict_with(disease, &pair, &features)
    }

    /// Predict from an already ordered, unscaled feature vector
    pub fn predict_vector(&self, disease: Disease, features: &[f64]) -> Result<PredictionResult> {
        let pair = self.pair(disease)?;
        self.predict_with(disease, &pair, features)
    }

    fn pair(&self, disease: Disease) -> Result<Arc<ModelPair>> {
        self.registry.get(disease).map_err(|e| {
            if e.is_unavailable() {
                warn!("{disease} model unavailable: {e}");
            } else {
                error!("reading {disease} artifacts failed: {e}");
            }
            DiagnosisError::PredictionUnavailable(disease.config().display_name.to_string())
        })
    }

    fn predict_with(
        &self,
        disease: Disease,
        pair: &ModelPair,
        features: &[f64],
    ) -> Result<PredictionResult> {
        if let Some(pos) = features.iter().position(|x| !x.is_finite()) {
            return Err(DiagnosisError::MalformedInput(format!(
                "feature {pos} is not a finite number"
            )));
        }
        let scaled = pair.scaler.transform(features)?;
        let prediction = pair.model.predict(&scaled);
        let confidence = confidence(pair.model.predict_proba(&scaled));
        let risk_level = risk_level(prediction.label, confidence);
        debug!(
            "{disease}: label {} (decision {:.4}), confidence {:.3}, {risk_level} risk",
            prediction.label, prediction.decision_value, confidence
        );

        Ok(PredictionResult {
            prediction: prediction.label,
            confidence,
            message: disease.config().message(prediction.label).to_string(),
            risk_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SVM;
    use crate::core::Sample;
    use crate::scaling::ScalerParams;
    use serde_json::json;
    use tempfile::TempDir;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_confidence_fallback() {
        assert_eq!(confidence(None), DEFAULT_CONFIDENCE);
        assert_eq!(confidence(Some([0.3, 0.7])), 0.7);
        assert_eq!(confidence(Some([0.9, 0.1])), 0.9);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(risk_level(0, DEFAULT_CONFIDENCE), RiskLevel::Low);
        assert_eq!(risk_level(0, 0.61), RiskLevel::Low);
        assert_eq!(risk_level(0, LOW_CONFIDENCE_THRESHOLD), RiskLevel::Medium);
        assert_eq!(risk_level(0, 0.5), RiskLevel::Medium);

        assert_eq!(risk_level(1, DEFAULT_CONFIDENCE), RiskLevel::High);
        assert_eq!(risk_level(1, HIGH_RISK_THRESHOLD), RiskLevel::Medium);
        assert_eq!(risk_level(1, 0.55), RiskLevel::Medium);
    }

    #[test]
    fn test_assemble_canonical_order() {
        let fields = as_map(json!({
            "age": 30, "diabetesPedigreeFunction": 0.191, "bmi": 37.6, "insulin": 0,
            "skinThickness": 0, "bloodPressure": 92, "glucose": "110", "pregnancies": 4,
            "extra": "ignored"
        }));
        let features = assemble_features(Disease::Diabetes, &fields).unwrap();
        assert_eq!(features, vec![4.0, 110.0, 92.0, 0.0, 0.0, 37.6, 0.191, 30.0]);
    }

    #[test]
    fn test_assemble_missing_field() {
        let fields = as_map(json!({
            "sex": 1, "cp": 0, "trestbps": 140, "chol": 192, "fbs": 0, "restecg": 1,
            "thalach": 148, "exang": 0, "oldpeak": 0.4, "slope": 1, "ca": 0, "thal": 1
        }));
        match assemble_features(Disease::Heart, &fields) {
            Err(DiagnosisError::MissingField(name)) => assert_eq!(name, "age"),
            other => panic!("expected missing age, got {other:?}"),
        }
    }

    #[test]
    fn test_assemble_malformed_value() {
        let mut fields = as_map(json!({
            "pregnancies": 4, "glucose": 110, "bloodPressure": 92, "skinThickness": 0,
            "insulin": 0, "bmi": 37.6, "diabetesPedigreeFunction": 0.191
        }));
        fields.insert("age".to_string(), json!([30]));
        assert!(matches!(
            assemble_features(Disease::Diabetes, &fields),
            Err(DiagnosisError::MalformedInput(_))
        ));

        fields.insert("age".to_string(), Value::Null);
        assert!(matches!(
            assemble_features(Disease::Diabetes, &fields),
            Err(DiagnosisError::MissingField(_))
        ));
    }

    fn diabetes_store(dir: &std::path::Path) -> ModelStore {
        let rows: Vec<Vec<f64>> = (0..12)
            .map(|i| (0..8).map(|j| ((i * 5 + j * 3) % 13) as f64).collect())
            .collect();
        let labels: Vec<u8> = rows.iter().map(|r| u8::from(r[1] > 6.0)).collect();
        let scaler = ScalerParams::fit(&rows).unwrap();
        let samples: Vec<Sample> = scaler
            .transform_batch(&rows)
            .unwrap()
            .into_iter()
            .zip(labels)
            .map(|(x, y)| Sample::from_binary(x, y))
            .collect();
        let model = SVM::new().train_samples(&samples).unwrap();

        let store = ModelStore::new(dir);
        store.save(Disease::Diabetes, &scaler, &model).unwrap();
        store
    }

    #[test]
    fn test_non_finite_vector_rejected() {
        let dir = TempDir::new().unwrap();
        let service = PredictionService::from_store(diabetes_store(dir.path()));

        let valid = [4.0, 110.0, 92.0, 0.0, 0.0, 37.6, 0.191, 30.0];
        assert!(service.predict_vector(Disease::Diabetes, &valid).is_ok());

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut features = valid;
            features[1] = bad;
            let result = service.predict_vector(Disease::Diabetes, &features);
            assert!(
                matches!(result, Err(DiagnosisError::MalformedInput(_))),
                "{bad}: {result:?}"
            );
        }
    }

    #[test]
    fn test_unavailable_model() {
        let dir = TempDir::new().unwrap();
        let service = PredictionService::from_store(ModelStore::new(dir.path()));

        let result = service.predict_vector(Disease::Heart, &[0.0; 13]);
        assert!(matches!(
            result,
            Err(DiagnosisError::PredictionUnavailable(ref name)) if name == "Heart disease"
        ));
        assert!(!service.registry().is_loaded(Disease::Heart));
        assert_eq!(
            service.models_loaded(),
            ModelsLoaded {
                diabetes: false,
                heart: false,
                parkinsons: false
            }
        );
    }
}
