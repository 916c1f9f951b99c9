//! Route prediction over the loaded artifacts.
//!
//! Ties the feature list, label encoding, and booster together behind a
//! `predict(features) -> route` surface, so callers never touch the native
//! model format directly.

use crate::artifacts::{self, ArtifactStore};
use crate::models::xgboost::Booster;
use anyhow::{ensure, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a single route prediction.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePrediction {
    /// Predicted route name (decoded through the label mapping)
    pub route: String,
    /// Integer class code of the predicted route
    pub class_index: usize,
    /// Probability of the predicted route
    pub probability: f32,
    /// Probability per route name
    pub class_probabilities: HashMap<String, f32>,
}

/// Predicts receiver routes from feature rows.
pub struct RoutePredictor {
    features: Arc<Vec<String>>,
    decoder: HashMap<usize, String>,
    booster: Arc<Booster>,
}

impl RoutePredictor {
    /// Build a predictor over the process-wide artifact store.
    pub fn new() -> Result<Self> {
        Self::from_store(artifacts::global())
    }

    /// Build a predictor from a specific artifact store.
    pub fn from_store(store: &ArtifactStore) -> Result<Self> {
        let features = store
            .feature_list()
            .context("loading route feature list")?;
        let encoder = store
            .label_encoder()
            .context("loading route label mapping")?;
        let booster = store.model().context("loading route model")?;

        let decoder: HashMap<usize, String> = encoder
            .iter()
            .map(|(route, &code)| (code as usize, route.clone()))
            .collect();

        info!(
            features = features.len(),
            routes = decoder.len(),
            num_trees = booster.num_trees(),
            "Route predictor initialized"
        );

        Ok(Self {
            features,
            decoder,
            booster,
        })
    }

    /// Feature names in the order the model expects them.
    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    /// Number of features in a prediction row.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Assemble a feature row from named values, in feature-list order.
    ///
    /// Features absent from the map become NaN, so the booster's default
    /// branches handle them as missing.
    pub fn build_row(&self, values: &HashMap<String, f64>) -> Vec<f32> {
        self.features
            .iter()
            .map(|name| values.get(name).map(|&v| v as f32).unwrap_or(f32::NAN))
            .collect()
    }

    /// Predict the route for a feature row.
    pub fn predict(&self, row: &[f32]) -> Result<RoutePrediction> {
        ensure!(
            row.len() == self.features.len(),
            "feature row has {} values, model expects {}",
            row.len(),
            self.features.len()
        );

        let probabilities = self.booster.predict_proba(row);
        let (class_index, probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .context("model produced no class probabilities")?;

        let route = self
            .decoder
            .get(&class_index)
            .cloned()
            .with_context(|| format!("no route label for class {class_index}"))?;

        let class_probabilities = probabilities
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| self.decoder.get(&i).map(|r| (r.clone(), p)))
            .collect();

        debug!(route = %route, probability, "Route prediction complete");

        Ok(RoutePrediction {
            route,
            class_index,
            probability,
            class_probabilities,
        })
    }

    /// Predict from named feature values.
    pub fn predict_named(&self, values: &HashMap<String, f64>) -> Result<RoutePrediction> {
        self.predict(&self.build_row(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::default_models_dir;

    fn shipped_predictor() -> RoutePredictor {
        let store = ArtifactStore::new(default_models_dir());
        RoutePredictor::from_store(&store).unwrap()
    }

    #[test]
    fn test_predict_over_shipped_artifacts() {
        let predictor = shipped_predictor();
        assert_eq!(predictor.feature_count(), 8);

        // 1st-and-10, soft cushion, no play action: the curl tree is the
        // only one reaching a strongly positive leaf.
        let row = [1.0, 10.0, 60.0, 2.0, 7.0, 2.5, 1.0, 0.0];
        let prediction = predictor.predict(&row).unwrap();

        assert_eq!(prediction.route, "curl");
        assert_eq!(prediction.class_index, 1);
        assert!(prediction.probability > 0.15);
        assert_eq!(prediction.class_probabilities.len(), 6);
        let total: f32 = prediction.class_probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_press_coverage_predicts_go() {
        let predictor = shipped_predictor();

        // Short distance with a 2-yard cushion: press coverage, go route.
        let row = [2.0, 5.0, 50.0, 1.0, 2.0, 2.0, 1.0, 0.0];
        let prediction = predictor.predict(&row).unwrap();
        assert_eq!(prediction.route, "go");
    }

    #[test]
    fn test_row_width_is_validated() {
        let predictor = shipped_predictor();
        let err = predictor.predict(&[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("model expects 8"));
    }

    #[test]
    fn test_build_row_orders_and_fills_missing() {
        let predictor = shipped_predictor();

        let mut values = HashMap::new();
        values.insert("down".to_string(), 3.0);
        values.insert("distance".to_string(), 4.0);
        let row = predictor.build_row(&values);

        assert_eq!(row.len(), predictor.feature_count());
        assert_eq!(row[0], 3.0);
        assert_eq!(row[1], 4.0);
        assert!(row[2..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_predict_named_matches_explicit_row() {
        let predictor = shipped_predictor();

        let values: HashMap<String, f64> = predictor
            .feature_names()
            .iter()
            .cloned()
            .zip([1.0, 10.0, 60.0, 2.0, 7.0, 2.5, 1.0, 0.0])
            .collect();

        let named = predictor.predict_named(&values).unwrap();
        let explicit = predictor
            .predict(&[1.0, 10.0, 60.0, 2.0, 7.0, 2.5, 1.0, 0.0])
            .unwrap();
        assert_eq!(named.route, explicit.route);
        assert!((named.probability - explicit.probability).abs() < 1e-6);
    }
}
