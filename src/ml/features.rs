//! Input feature vector, clamping, and engineered features.

use serde::{Deserialize, Deserializer, Serialize};

/// Lower/upper bound applied to temperature (°C) before scoring.
pub const TEMPERATURE_RANGE: (f64, f64) = (10.0, 45.0);
/// Lower/upper bound applied to rainfall (mm) before scoring.
pub const RAINFALL_RANGE: (f64, f64) = (100.0, 2500.0);

/// Weather and soil inputs for one prediction request.
///
/// Numeric fields are not validated: numbers are taken as-is, numeric strings
/// are parsed, and anything else (missing, `null`, text) becomes `NaN` and
/// flows through the arithmetic unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Crop label, matched case-insensitively against the multiplier table.
    pub crop: String,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub temperature: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub rainfall: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub humidity: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub soil_ph: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub nitrogen: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub phosphorus: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub potassium: f64,
}

/// Raw feature values after clamping. Used for every derived quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedFeatures {
    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
    pub soil_ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// Engineered scalars computed from [`ClampedFeatures`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    /// `temperature * rainfall / 1000`.
    pub temp_rainfall_interaction: f64,
    /// `soil_ph * (N + P + K) / 100`.
    pub ph_fertilizer_interaction: f64,
    /// `(temperature / 10)^2`.
    pub temp_squared: f64,
    /// `N / (P + K + 1)`.
    pub npk_ratio: f64,
    /// `(humidity / 50)^2`.
    pub humidity_squared: f64,
}

/// Fully preprocessed input: clamped raw values plus engineered features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedFeatures {
    pub clamped: ClampedFeatures,
    pub derived: DerivedFeatures,
}

/// Clamp temperature into [`TEMPERATURE_RANGE`].
pub fn clamp_temperature(value: f64) -> f64 {
    clamp_range(value, TEMPERATURE_RANGE)
}

/// Clamp rainfall into [`RAINFALL_RANGE`].
pub fn clamp_rainfall(value: f64) -> f64 {
    clamp_range(value, RAINFALL_RANGE)
}

// `f64::clamp` keeps NaN, which is the intended pass-through for bad input.
fn clamp_range(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}

/// `temperature * rainfall / 1000`, shared with the dataset importer.
pub fn temp_rainfall_interaction(temperature: f64, rainfall: f64) -> f64 {
    temperature * rainfall / 1000.0
}

/// `N / (P + K + 1)`, shared with the dataset importer.
pub fn npk_ratio(nitrogen: f64, phosphorus: f64, potassium: f64) -> f64 {
    nitrogen / (phosphorus + potassium + 1.0)
}

impl FeatureVector {
    /// Clamp the weather inputs and compute the engineered features.
    pub fn prepare(&self) -> PreparedFeatures {
        let clamped = ClampedFeatures {
            temperature: clamp_temperature(self.temperature),
            rainfall: clamp_rainfall(self.rainfall),
            humidity: self.humidity,
            soil_ph: self.soil_ph,
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
        };
        PreparedFeatures {
            clamped,
            derived: DerivedFeatures::from_clamped(&clamped),
        }
    }
}

impl DerivedFeatures {
    pub fn from_clamped(c: &ClampedFeatures) -> Self {
        let fertilizer = c.nitrogen + c.phosphorus + c.potassium;
        Self {
            temp_rainfall_interaction: temp_rainfall_interaction(c.temperature, c.rainfall),
            ph_fertilizer_interaction: c.soil_ph * fertilizer / 100.0,
            temp_squared: (c.temperature / 10.0).powi(2),
            npk_ratio: npk_ratio(c.nitrogen, c.phosphorus, c.potassium),
            humidity_squared: (c.humidity / 50.0).powi(2),
        }
    }
}

fn nan() -> f64 {
    f64::NAN
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(text)) => text.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}
