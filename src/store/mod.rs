//! Row store used by the estimator: reference rows in, audit rows out.
//!
//! The estimator only sees the [`RowStore`] trait. [`SqliteRowStore`] backs
//! the service and tools; [`MemoryRowStore`] is handy for tests and for
//! embedding the estimator without a database.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::estimator::BestModel;
use crate::ml::features::{self, FeatureVector};

mod memory;
/// SQLite implementation of the row store.
pub mod sqlite;

pub use memory::MemoryRowStore;
pub use sqlite::SqliteRowStore;

/// Historical observation compared against incoming requests.
///
/// Engineered fields default to zero when the source row lacks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
    pub soil_ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    #[serde(rename = "yield")]
    pub observed_yield: f64,
    #[serde(default)]
    pub temp_rainfall_interaction: f64,
    #[serde(default)]
    pub npk_ratio: f64,
}

/// Audit row appended after every prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Random record identifier; records are never deduplicated.
    pub id: String,
    /// Creation time in UTC epoch seconds.
    pub created_at: i64,
    /// Raw request values, before clamping.
    pub input: FeatureVector,
    pub predicted_yield: f64,
    /// `predicted_yield * 1.05`, reported as the ensemble figure.
    pub ensemble_prediction: f64,
    pub best_model: BestModel,
    /// JSON object of the feature importances returned to the caller.
    pub feature_importances: String,
    pub confidence: f64,
}

/// Errors returned by row store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query failed.
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Failed to create the database parent directory.
    #[error("Could not create database directory {path}: {source}")]
    CreateDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    /// Database is locked or busy.
    #[error("Database is busy, please retry")]
    Busy,
    /// SQLite returned an unexpected result.
    #[error("SQLite returned an unexpected result")]
    Unexpected,
    /// Stored record could not be encoded or decoded.
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
    /// In-memory store lock was poisoned by a panicking writer.
    #[error("Row store lock poisoned")]
    Poisoned,
}

/// Source of reference rows and sink for prediction audit rows.
pub trait RowStore {
    /// Return up to `limit` reference rows in stable storage order.
    fn reference_rows(&self, limit: usize) -> Result<Vec<ReferenceRow>, StoreError>;

    /// Append one prediction record.
    fn append_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError>;
}

impl<T: RowStore + ?Sized> RowStore for &T {
    fn reference_rows(&self, limit: usize) -> Result<Vec<ReferenceRow>, StoreError> {
        (**self).reference_rows(limit)
    }

    fn append_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        (**self).append_prediction(record)
    }
}

impl ReferenceRow {
    /// Build a row from raw observations, computing the engineered fields.
    ///
    /// `features` is ordered temperature, rainfall, humidity, soil pH, N, P, K.
    pub fn observed(crop: &str, features: [f64; 7], observed_yield: f64) -> Self {
        let [temperature, rainfall, humidity, soil_ph, nitrogen, phosphorus, potassium] = features;
        Self {
            crop: Some(crop.to_string()),
            state: None,
            year: None,
            temperature,
            rainfall,
            humidity,
            soil_ph,
            nitrogen,
            phosphorus,
            potassium,
            observed_yield,
            temp_rainfall_interaction: features::temp_rainfall_interaction(temperature, rainfall),
            npk_ratio: features::npk_ratio(nitrogen, phosphorus, potassium),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_row_defaults_missing_engineered_fields_to_zero() {
        let row: ReferenceRow = serde_json::from_str(
            r#"{"temperature":25,"rainfall":800,"humidity":60,"soil_ph":6.5,
                "nitrogen":90,"phosphorus":40,"potassium":120,"yield":4.2}"#,
        )
        .unwrap();
        assert_eq!(row.temp_rainfall_interaction, 0.0);
        assert_eq!(row.npk_ratio, 0.0);
        assert_eq!(row.observed_yield, 4.2);
        assert!(row.crop.is_none());
    }

    #[test]
    fn observed_rows_compute_engineered_fields() {
        let row = ReferenceRow::observed("rice", [30.0, 1000.0, 70.0, 6.0, 100.0, 49.0, 50.0], 5.5);
        assert_eq!(row.temp_rainfall_interaction, 30.0);
        assert_eq!(row.npk_ratio, 1.0);
        assert_eq!(row.crop.as_deref(), Some("rice"));
    }
}
