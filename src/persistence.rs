//! Model artifact persistence
//!
//! Each disease owns two pretty-printed JSON files in the model directory,
//! `{disease}_scaler.json` and `{disease}_model.json`. Both are wrapped in an
//! envelope carrying a format version and a `pair_id` shared by the two
//! files of one training run, so a scaler is never combined with a model it
//! was not trained with.

use crate::classifier::TrainedSVM;
use crate::core::{BinaryClassifier, DiagnosisError, Result};
use crate::disease::Disease;
use crate::scaling::ScalerParams;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Artifact layout version written by this build
pub const FORMAT_VERSION: u32 = 1;

/// On-disk wrapper around a scaler or model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    pub format_version: u32,
    pub disease: Disease,
    pub pair_id: String,
    pub library_version: String,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

/// Metadata shared by both artifacts of a pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub disease: Disease,
    pub pair_id: String,
    pub library_version: String,
    pub created_at: DateTime<Utc>,
}

impl ArtifactMetadata {
    fn wrap<T>(&self, payload: T) -> ArtifactEnvelope<T> {
        ArtifactEnvelope {
            format_version: self.format_version,
            disease: self.disease,
            pair_id: self.pair_id.clone(),
            library_version: self.library_version.clone(),
            created_at: self.created_at,
            payload,
        }
    }
}

/// A scaler and the model trained on its output
#[derive(Debug, Clone)]
pub struct ModelPair {
    pub scaler: ScalerParams,
    pub model: TrainedSVM,
    pub metadata: ArtifactMetadata,
}

/// Paths written by a successful save
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedArtifacts {
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
    pub pair_id: String,
}

/// Directory-backed store of per-disease artifact pairs
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scaler_path(&self, disease: Disease) -> PathBuf {
        self.dir.join(format!("{disease}_scaler.json"))
    }

    pub fn model_path(&self, disease: Disease) -> PathBuf {
        self.dir.join(format!("{disease}_model.json"))
    }

    /// Whether both artifacts of a pair are present
    pub fn exists(&self, disease: Disease) -> bool {
        self.scaler_path(disease).is_file() && self.model_path(disease).is_file()
    }

    /// Persist a scaler/model pair
    ///
    /// Both files are written to temporary siblings and only renamed into
    /// place once both writes succeed. If the second rename fails the first
    /// is removed again, so a half-written pair is never left behind.
    pub fn save(
        &self,
        disease: Disease,
        scaler: &ScalerParams,
        model: &TrainedSVM,
    ) -> Result<SavedArtifacts> {
        fs::create_dir_all(&self.dir)?;

        let metadata = ArtifactMetadata {
            format_version: FORMAT_VERSION,
            disease,
            pair_id: new_pair_id(),
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
        };

        let scaler_path = self.scaler_path(disease);
        let model_path = self.model_path(disease);
        let scaler_tmp = tmp_sibling(&scaler_path);
        let model_tmp = tmp_sibling(&model_path);

        let written = write_json(&scaler_tmp, &metadata.wrap(scaler))
            .and_then(|_| write_json(&model_tmp, &metadata.wrap(model)));
        if let Err(e) = written {
            discard(&scaler_tmp);
            discard(&model_tmp);
            return Err(e);
        }

        if let Err(e) = fs::rename(&scaler_tmp, &scaler_path) {
            discard(&scaler_tmp);
            discard(&model_tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&model_tmp, &model_path) {
            warn!("rolling back {} after failed model write", scaler_path.display());
            discard(&scaler_path);
            discard(&model_tmp);
            return Err(e.into());
        }

        info!(
            "saved {disease} artifacts (pair {}) to {}",
            metadata.pair_id,
            self.dir.display()
        );
        Ok(SavedArtifacts {
            scaler_path,
            model_path,
            pair_id: metadata.pair_id,
        })
    }

    /// Load and cross-check a disease's artifact pair
    pub fn load(&self, disease: Disease) -> Result<ModelPair> {
        let scaler: ArtifactEnvelope<ScalerParams> =
            read_artifact(disease, &self.scaler_path(disease))?;
        let model: ArtifactEnvelope<TrainedSVM> =
            read_artifact(disease, &self.model_path(disease))?;

        if scaler.pair_id != model.pair_id {
            return Err(DiagnosisError::PairMismatch {
                disease: disease.to_string(),
            });
        }

        let corrupt = |reason: String| DiagnosisError::ArtifactCorrupt {
            disease: disease.to_string(),
            reason,
        };
        scaler
            .payload
            .validate()
            .map_err(|e| corrupt(format!("scaler: {e}")))?;
        model
            .payload
            .validate()
            .map_err(|e| corrupt(format!("model: {e}")))?;

        let expected = disease.config().n_features();
        for (what, found) in [
            ("scaler", scaler.payload.n_features()),
            ("model", model.payload.n_features()),
        ] {
            if found != expected {
                return Err(corrupt(format!(
                    "{what} expects {found} features, {disease} has {expected}"
                )));
            }
        }

        debug!("loaded {disease} artifacts (pair {})", model.pair_id);
        Ok(ModelPair {
            scaler: scaler.payload,
            model: model.payload,
            metadata: ArtifactMetadata {
                format_version: model.format_version,
                disease,
                pair_id: model.pair_id,
                library_version: model.library_version,
                created_at: model.created_at,
            },
        })
    }
}

fn read_artifact<T: DeserializeOwned>(
    disease: Disease,
    path: &Path,
) -> Result<ArtifactEnvelope<T>> {
    if !path.is_file() {
        return Err(DiagnosisError::ArtifactMissing {
            disease: disease.to_string(),
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path)?;
    let corrupt = |reason: String| DiagnosisError::ArtifactCorrupt {
        disease: disease.to_string(),
        reason: format!("{}: {reason}", path.display()),
    };

    let probe: VersionProbe = serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
    if probe.format_version != FORMAT_VERSION {
        return Err(DiagnosisError::IncompatibleArtifact {
            found: probe.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let envelope: ArtifactEnvelope<T> =
        serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
    if envelope.disease != disease {
        return Err(corrupt(format!("artifact belongs to {}", envelope.disease)));
    }
    Ok(envelope)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| DiagnosisError::SerializationError(e.to_string()))?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| DiagnosisError::IoError(e.into_error()))?
        .sync_all()?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove {}: {e}", path.display());
        }
    }
}

fn new_pair_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let salt: u32 = rand::thread_rng().gen();
    format!("{nanos:x}-{salt:08x}")
}
