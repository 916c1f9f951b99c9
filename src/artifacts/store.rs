//! Cached artifact store.
//!
//! Each artifact is read from disk at most once per store; later accessors
//! hand back the same shared value. A failed load is not cached, so a later
//! call sees the current state of the directory.

use crate::artifacts::error::ArtifactError;
use crate::models::xgboost::Booster;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::info;

const FEATURES_FILE: &str = "route_features.json";
const LABEL_MAPPING_FILE: &str = "route_label_mapping.json";
const MODEL_FILE: &str = "route_model.json";

/// Registry owning the three lazily loaded artifacts.
///
/// Slots are `OnceCell`s, so a concurrent first access performs exactly one
/// load and every caller shares the same immutable value afterwards.
pub struct ArtifactStore {
    models_dir: PathBuf,
    features: OnceCell<Arc<Vec<String>>>,
    encoder: OnceCell<Arc<HashMap<String, i64>>>,
    booster: OnceCell<Arc<Booster>>,
}

impl ArtifactStore {
    /// Create a store over a models directory.
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Self {
        Self {
            models_dir: models_dir.into(),
            features: OnceCell::new(),
            encoder: OnceCell::new(),
            booster: OnceCell::new(),
        }
    }

    /// Create a store from application configuration.
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(&config.models.models_dir)
    }

    /// Directory this store resolves artifacts in.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Ordered feature names from `route_features.json`.
    pub fn feature_list(&self) -> Result<Arc<Vec<String>>, ArtifactError> {
        self.features
            .get_or_try_init(|| {
                let path = self.models_dir.join(FEATURES_FILE);
                let value = read_json(&path)?;
                if !value.is_array() {
                    return Err(ArtifactError::Malformed {
                        path,
                        expected: "a JSON list of feature names",
                    });
                }
                let features: Vec<String> = serde_json::from_value(value)?;
                info!(
                    count = features.len(),
                    path = %path.display(),
                    "Route feature list loaded"
                );
                Ok(Arc::new(features))
            })
            .cloned()
    }

    /// Route-name to class-code mapping from `route_label_mapping.json`.
    pub fn label_encoder(&self) -> Result<Arc<HashMap<String, i64>>, ArtifactError> {
        self.encoder
            .get_or_try_init(|| {
                let path = self.models_dir.join(LABEL_MAPPING_FILE);
                let value = read_json(&path)?;
                if !value.is_object() {
                    return Err(ArtifactError::Malformed {
                        path,
                        expected: "a JSON object mapping route to class code",
                    });
                }
                let encoder: HashMap<String, i64> = serde_json::from_value(value)?;
                info!(
                    routes = encoder.len(),
                    path = %path.display(),
                    "Route label mapping loaded"
                );
                Ok(Arc::new(encoder))
            })
            .cloned()
    }

    /// Trained booster from `route_model.json`.
    pub fn model(&self) -> Result<Arc<Booster>, ArtifactError> {
        self.booster
            .get_or_try_init(|| {
                let path = self.models_dir.join(MODEL_FILE);
                if !path.exists() {
                    return Err(ArtifactError::Missing { path });
                }
                let booster = Booster::load_model(&path)?;
                info!(
                    num_trees = booster.num_trees(),
                    num_class = booster.num_class(),
                    path = %path.display(),
                    "Route model loaded"
                );
                Ok(Arc::new(booster))
            })
            .cloned()
    }
}

fn read_json(path: &Path) -> Result<Value, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Models directory anchored at the crate root.
pub fn default_models_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("models")
}

static GLOBAL: OnceLock<ArtifactStore> = OnceLock::new();

/// Process-wide store over the default models directory.
pub fn global() -> &'static ArtifactStore {
    GLOBAL.get_or_init(|| ArtifactStore::new(default_models_dir()))
}
