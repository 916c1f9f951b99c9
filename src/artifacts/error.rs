//! Artifact loading errors.

use crate::models::xgboost::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure modes when loading a model artifact.
///
/// `Missing` and `Malformed` are the two conditions callers are expected to
/// distinguish; I/O, JSON, and native-model errors pass through from the
/// underlying layer.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The expected file does not exist at the resolved path.
    #[error("missing artifact: {}", path.display())]
    Missing { path: PathBuf },

    /// The file parsed as JSON but has the wrong structural shape.
    #[error("malformed artifact {}: expected {expected}", path.display())]
    Malformed {
        path: PathBuf,
        expected: &'static str,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to read artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse artifact JSON: {0}")]
    Json(#[from] serde_json::Error),
}
