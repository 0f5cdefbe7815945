//! Yield estimator: preprocessing, neighbor/linear scoring, and audit logging.
//!
//! One call to [`YieldEstimator::predict`] performs a bounded read from the
//! row store, scores the request, and appends one audit row. No state is
//! kept between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::crops::crop_multiplier;
use crate::ml::features::FeatureVector;
use crate::ml::knn;
use crate::ml::linear::{FALLBACK_COEFFICIENTS, FALLBACK_CONFIDENCE};
use crate::ml::metrics::{MODEL_METRICS, ModelMetrics, feature_importances};
use crate::store::{PredictionRecord, ReferenceRow, RowStore, StoreError};

/// Upper bound on reference rows read per prediction.
pub const MAX_REFERENCE_ROWS: usize = 200;
/// Factor applied to the prediction to report the ensemble figure.
pub const ENSEMBLE_FACTOR: f64 = 1.05;

/// Scoring path that produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BestModel {
    /// Distance-weighted neighbor average with crop adjustment.
    #[serde(rename = "Hybrid_Enhanced")]
    HybridEnhanced,
    /// Fixed linear fallback used when no reference rows exist.
    #[serde(rename = "Enhanced_Linear_Regression")]
    EnhancedLinearRegression,
}

impl BestModel {
    /// Public identifier used in responses and audit rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HybridEnhanced => "Hybrid_Enhanced",
            Self::EnhancedLinearRegression => "Enhanced_Linear_Regression",
        }
    }

    /// Parse a stored identifier.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Hybrid_Enhanced" => Some(Self::HybridEnhanced),
            "Enhanced_Linear_Regression" => Some(Self::EnhancedLinearRegression),
            _ => None,
        }
    }
}

/// What to do when the audit row cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPolicy {
    /// Return the estimate and log the failed write.
    #[default]
    Log,
    /// Fail the whole call.
    Fail,
}

/// Per-process estimator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorSettings {
    /// Reference rows read per call, at most [`MAX_REFERENCE_ROWS`].
    pub reference_limit: usize,
    pub audit_policy: AuditPolicy,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            reference_limit: MAX_REFERENCE_ROWS,
            audit_policy: AuditPolicy::default(),
        }
    }
}

/// Estimate returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_yield: f64,
    pub confidence: f64,
    pub best_model: BestModel,
    pub feature_importances: BTreeMap<String, f64>,
    pub model_metrics: ModelMetrics,
}

/// Errors that abort a prediction.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// Reference rows could not be read.
    #[error("Failed to load reference data: {0}")]
    Retrieval(#[source] StoreError),
    /// The audit row could not be written.
    #[error("Failed to record prediction: {0}")]
    Audit(#[source] StoreError),
}

/// Stateless scorer bound to a row store.
pub struct YieldEstimator<S> {
    store: S,
    settings: EstimatorSettings,
}

impl<S: RowStore> YieldEstimator<S> {
    pub fn new(store: S, settings: EstimatorSettings) -> Self {
        let settings = EstimatorSettings {
            reference_limit: settings.reference_limit.clamp(1, MAX_REFERENCE_ROWS),
            ..settings
        };
        Self { store, settings }
    }

    pub fn settings(&self) -> EstimatorSettings {
        self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read reference rows, score the request, and append the audit row.
    pub fn predict(&self, input: &FeatureVector) -> Result<PredictionResult, EstimateError> {
        let rows = self
            .store
            .reference_rows(self.settings.reference_limit)
            .map_err(EstimateError::Retrieval)?;
        let result = score(input, &rows);
        tracing::debug!(
            crop = %input.crop,
            reference_rows = rows.len(),
            model = result.best_model.as_str(),
            "Scored prediction"
        );

        if let Err(err) = self.record(input, &result) {
            match self.settings.audit_policy {
                AuditPolicy::Fail => return Err(err),
                AuditPolicy::Log => {
                    tracing::error!(crop = %input.crop, "Prediction returned without audit row: {err}");
                }
            }
        }
        Ok(result)
    }

    fn record(&self, input: &FeatureVector, result: &PredictionResult) -> Result<(), EstimateError> {
        let record = audit_record(input, result).map_err(EstimateError::Audit)?;
        self.store
            .append_prediction(&record)
            .map_err(EstimateError::Audit)
    }
}

/// Score a request against an already-retrieved sample. Pure and deterministic.
pub fn score(input: &FeatureVector, rows: &[ReferenceRow]) -> PredictionResult {
    let prepared = input.prepare();
    let (predicted_yield, confidence, best_model) = match knn::estimate(rows, &prepared) {
        Some(estimate) => (
            estimate.weighted_yield * crop_multiplier(&input.crop),
            estimate.confidence,
            BestModel::HybridEnhanced,
        ),
        None => (
            FALLBACK_COEFFICIENTS.predict(&prepared),
            FALLBACK_CONFIDENCE,
            BestModel::EnhancedLinearRegression,
        ),
    };
    PredictionResult {
        predicted_yield,
        confidence,
        best_model,
        feature_importances: feature_importances(),
        model_metrics: MODEL_METRICS,
    }
}

/// Build the audit row for a scored request. The raw input is kept unclamped.
pub fn audit_record(
    input: &FeatureVector,
    result: &PredictionResult,
) -> Result<PredictionRecord, StoreError> {
    let feature_importances = serde_json::to_string(&result.feature_importances)
        .map_err(|err| StoreError::InvalidRecord(err.to_string()))?;
    Ok(PredictionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: time::OffsetDateTime::now_utc().unix_timestamp(),
        input: input.clone(),
        predicted_yield: result.predicted_yield,
        ensemble_prediction: result.predicted_yield * ENSEMBLE_FACTOR,
        best_model: result.best_model,
        feature_importances,
        confidence: result.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRowStore;

    struct FailingStore {
        fail_reads: bool,
    }

    impl RowStore for FailingStore {
        fn reference_rows(&self, _limit: usize) -> Result<Vec<ReferenceRow>, StoreError> {
            if self.fail_reads {
                Err(StoreError::Busy)
            } else {
                Ok(Vec::new())
            }
        }

        fn append_prediction(&self, _record: &PredictionRecord) -> Result<(), StoreError> {
            Err(StoreError::Unexpected)
        }
    }

    fn wheat() -> FeatureVector {
        FeatureVector {
            crop: "wheat".to_string(),
            temperature: 30.0,
            rainfall: 900.0,
            humidity: 60.0,
            soil_ph: 6.5,
            nitrogen: 100.0,
            phosphorus: 40.0,
            potassium: 150.0,
        }
    }

    fn matching_row(input: &FeatureVector, observed_yield: f64) -> ReferenceRow {
        let prepared = input.prepare();
        let c = prepared.clamped;
        ReferenceRow::observed(
            &input.crop,
            [
                c.temperature,
                c.rainfall,
                c.humidity,
                c.soil_ph,
                c.nitrogen,
                c.phosphorus,
                c.potassium,
            ],
            observed_yield,
        )
    }

    #[test]
    fn empty_sample_uses_linear_fallback() {
        let result = score(&wheat(), &[]);
        assert_eq!(result.best_model, BestModel::EnhancedLinearRegression);
        assert_eq!(result.confidence, 0.65);
        assert!((result.predicted_yield - 15.776_278).abs() < 1e-6);
        assert_eq!(result.model_metrics, MODEL_METRICS);
        assert_eq!(result.feature_importances.len(), 11);
    }

    #[test]
    fn single_matching_row_is_scaled_by_crop() {
        for (crop, multiplier) in [("wheat", 0.9), ("Rice", 1.1), ("sorghum", 1.0)] {
            let mut input = wheat();
            input.crop = crop.to_string();
            let result = score(&input, &[matching_row(&input, 5.0)]);
            assert_eq!(result.best_model, BestModel::HybridEnhanced);
            assert!((result.predicted_yield - 5.0 * multiplier).abs() < 1e-9);
            assert_eq!(result.confidence, 0.95);
        }
    }

    #[test]
    fn out_of_range_input_matches_row_at_clamped_values() {
        let mut input = wheat();
        input.temperature = 70.0;
        input.rainfall = 3_000.0;
        let row = matching_row(&input, 4.0);
        assert_eq!(row.temperature, 45.0);
        assert_eq!(row.rainfall, 2_500.0);
        let prepared = input.prepare();
        assert_eq!(knn::distance(&row, &prepared), 0.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let input = wheat();
        let rows: Vec<ReferenceRow> = (0..60)
            .map(|idx| {
                let mut row = matching_row(&input, 3.0 + (idx % 9) as f64 * 0.4);
                row.temperature += (idx % 11) as f64;
                row.nitrogen -= (idx % 4) as f64 * 12.0;
                row
            })
            .collect();
        let first = score(&input, &rows);
        let second = score(&input, &rows);
        assert_eq!(first, second);
    }

    #[test]
    fn predict_appends_audit_row_with_raw_input() {
        let mut input = wheat();
        input.temperature = 80.0;
        let store = MemoryRowStore::new(vec![matching_row(&input, 5.0)]);
        let estimator = YieldEstimator::new(&store, EstimatorSettings::default());
        let result = estimator.predict(&input).unwrap();

        let records = store.predictions().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.input.temperature, 80.0);
        assert_eq!(record.best_model, BestModel::HybridEnhanced);
        assert_eq!(record.predicted_yield, result.predicted_yield);
        assert!((record.ensemble_prediction - result.predicted_yield * 1.05).abs() < 1e-12);
        assert_eq!(record.confidence, result.confidence);
        let importances: BTreeMap<String, f64> =
            serde_json::from_str(&record.feature_importances).unwrap();
        assert_eq!(importances, result.feature_importances);
    }

    #[test]
    fn every_call_appends_a_new_row() {
        let store = MemoryRowStore::default();
        let estimator = YieldEstimator::new(&store, EstimatorSettings::default());
        estimator.predict(&wheat()).unwrap();
        estimator.predict(&wheat()).unwrap();
        let records = store.predictions().unwrap();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn retrieval_failure_is_fatal() {
        let estimator = YieldEstimator::new(
            FailingStore { fail_reads: true },
            EstimatorSettings::default(),
        );
        let err = estimator.predict(&wheat()).unwrap_err();
        assert!(matches!(err, EstimateError::Retrieval(StoreError::Busy)));
    }

    #[test]
    fn audit_failure_follows_policy() {
        let logged = YieldEstimator::new(
            FailingStore { fail_reads: false },
            EstimatorSettings {
                audit_policy: AuditPolicy::Log,
                ..EstimatorSettings::default()
            },
        );
        let result = logged.predict(&wheat()).unwrap();
        assert_eq!(result.best_model, BestModel::EnhancedLinearRegression);

        let strict = YieldEstimator::new(
            FailingStore { fail_reads: false },
            EstimatorSettings {
                audit_policy: AuditPolicy::Fail,
                ..EstimatorSettings::default()
            },
        );
        let err = strict.predict(&wheat()).unwrap_err();
        assert!(matches!(err, EstimateError::Audit(StoreError::Unexpected)));
    }

    #[test]
    fn reference_limit_is_capped() {
        let estimator = YieldEstimator::new(
            MemoryRowStore::default(),
            EstimatorSettings {
                reference_limit: 5_000,
                ..EstimatorSettings::default()
            },
        );
        assert_eq!(estimator.settings().reference_limit, MAX_REFERENCE_ROWS);

        let estimator = YieldEstimator::new(
            MemoryRowStore::default(),
            EstimatorSettings {
                reference_limit: 0,
                ..EstimatorSettings::default()
            },
        );
        assert_eq!(estimator.settings().reference_limit, 1);
    }

    #[test]
    fn best_model_round_trips_identifier() {
        for model in [BestModel::HybridEnhanced, BestModel::EnhancedLinearRegression] {
            assert_eq!(BestModel::parse(model.as_str()), Some(model));
            assert_eq!(
                serde_json::to_value(model).unwrap(),
                serde_json::Value::String(model.as_str().to_string())
            );
        }
        assert_eq!(BestModel::parse("svm"), None);
    }
}
