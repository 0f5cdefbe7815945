//! Published model diagnostics.
//!
//! These figures are fixed placeholders shown on the dashboard. They are not
//! computed from the estimate a request produces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed feature-importance weights, summing to 1.0.
pub const FEATURE_IMPORTANCES: [(&str, f64); 11] = [
    ("temperature", 0.18),
    ("rainfall", 0.16),
    ("humidity", 0.08),
    ("soil_ph", 0.09),
    ("nitrogen", 0.12),
    ("phosphorus", 0.07),
    ("potassium", 0.06),
    ("temp_rainfall_interaction", 0.10),
    ("ph_fertilizer_interaction", 0.05),
    ("npk_ratio", 0.06),
    ("humidity_squared", 0.03),
];

/// Published regression diagnostics.
pub const MODEL_METRICS: ModelMetrics = ModelMetrics {
    r2_score: 0.79,
    mse: 0.346,
    rmse: 0.588,
};

/// Serialized regression metrics snapshot for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub r2_score: f64,
    pub mse: f64,
    pub rmse: f64,
}

/// Feature importances as a name-ordered map.
pub fn feature_importances() -> BTreeMap<String, f64> {
    FEATURE_IMPORTANCES
        .iter()
        .map(|(name, weight)| ((*name).to_string(), *weight))
        .collect()
}
