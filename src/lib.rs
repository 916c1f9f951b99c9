//! Route Predictor Library
//!
//! Loads the trained route model artifacts (feature list, label encoding,
//! and XGBoost booster) from the project `models/` directory, caches them
//! for the lifetime of the process, and exposes a thin prediction surface
//! on top of them.

pub mod artifacts;
pub mod config;
pub mod logging;
pub mod models;
pub mod predictor;

pub use artifacts::{
    route_features, route_label_encoder, route_model, ArtifactError, ArtifactStore,
};
pub use config::AppConfig;
pub use models::xgboost::Booster;
pub use predictor::{RoutePrediction, RoutePredictor};
