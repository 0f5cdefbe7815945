//! Hand-tuned linear model used when no reference rows are available.

use super::features::PreparedFeatures;

/// Fixed coefficients of the fallback model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCoefficients {
    pub intercept: f64,
    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
    pub soil_ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub temp_rainfall_interaction: f64,
    pub ph_fertilizer_interaction: f64,
    pub temp_squared: f64,
    pub npk_ratio: f64,
    pub humidity_squared: f64,
}

/// The coefficient table shipped with the estimator.
pub const FALLBACK_COEFFICIENTS: LinearCoefficients = LinearCoefficients {
    intercept: 2.5,
    temperature: 0.15,
    rainfall: 0.003,
    humidity: 0.02,
    soil_ph: 0.4,
    nitrogen: 0.008,
    phosphorus: 0.012,
    potassium: 0.006,
    temp_rainfall_interaction: 0.001,
    ph_fertilizer_interaction: 0.002,
    temp_squared: -0.001,
    npk_ratio: 0.05,
    humidity_squared: 0.01,
};

/// Smallest yield the fallback model reports.
pub const FALLBACK_YIELD_FLOOR: f64 = 0.5;
/// Confidence attached to every fallback estimate.
pub const FALLBACK_CONFIDENCE: f64 = 0.65;

impl LinearCoefficients {
    /// Evaluate the model without the floor.
    pub fn evaluate(&self, features: &PreparedFeatures) -> f64 {
        let c = &features.clamped;
        let d = &features.derived;
        self.intercept
            + self.temperature * c.temperature
            + self.rainfall * c.rainfall
            + self.humidity * c.humidity
            + self.soil_ph * c.soil_ph
            + self.nitrogen * c.nitrogen
            + self.phosphorus * c.phosphorus
            + self.potassium * c.potassium
            + self.temp_rainfall_interaction * d.temp_rainfall_interaction
            + self.ph_fertilizer_interaction * d.ph_fertilizer_interaction
            + self.temp_squared * d.temp_squared
            + self.npk_ratio * d.npk_ratio
            + self.humidity_squared * d.humidity_squared
    }

    /// Evaluate the model and apply [`FALLBACK_YIELD_FLOOR`].
    pub fn predict(&self, features: &PreparedFeatures) -> f64 {
        // `f64::max` returns the floor when the sum is NaN.
        self.evaluate(features).max(FALLBACK_YIELD_FLOOR)
    }
}
