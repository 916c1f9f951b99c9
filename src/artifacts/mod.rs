//! Lazy, process-wide loading of the trained route model artifacts.

pub mod error;
pub mod store;

pub use error::ArtifactError;
pub use store::{default_models_dir, global, ArtifactStore};

use crate::models::xgboost::Booster;
use std::collections::HashMap;
use std::sync::Arc;

/// Feature names the route model expects, in training order.
///
/// Loaded once from `models/route_features.json`.
pub fn route_features() -> Result<Arc<Vec<String>>, ArtifactError> {
    global().feature_list()
}

/// Mapping from route name to the integer class code used in training.
///
/// Loaded once from `models/route_label_mapping.json`.
pub fn route_label_encoder() -> Result<Arc<HashMap<String, i64>>, ArtifactError> {
    global().label_encoder()
}

/// The trained route model as a raw booster handle.
///
/// Loaded once from `models/route_model.json` via the native JSON loader.
pub fn route_model() -> Result<Arc<Booster>, ArtifactError> {
    global().model()
}
