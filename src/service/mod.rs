//! Request/response envelope around the estimator.
//!
//! Transport-independent: the HTTP router and `cropyield-predict` both feed
//! raw request bytes through [`handle_predict`] and render the result or the
//! `{error}` envelope.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::estimator::{BestModel, EstimateError, PredictionResult, YieldEstimator};
use crate::ml::features::FeatureVector;
use crate::ml::metrics::ModelMetrics;
use crate::store::RowStore;

/// HTTP routes serving predictions and dataset documents.
pub mod http;

/// Provenance labels attached to every successful response.
pub const DATA_SOURCES: [&str; 3] = [
    "Historical crop yield records",
    "Weather station observations",
    "Soil nutrient surveys",
];
/// Disclaimer attached to every successful response.
pub const NOTE: &str = "Estimates combine nearest historical observations with a regression \
                        fallback and are indicative only.";

/// Successful prediction response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub predicted_crop: String,
    /// Rounded to two decimals.
    pub predicted_yield: f64,
    /// Rounded to two decimals.
    pub confidence: f64,
    pub best_model: BestModel,
    pub feature_importances: BTreeMap<String, f64>,
    pub model_metrics: ModelMetrics,
    pub data_sources: [&'static str; 3],
    pub note: &'static str,
}

/// Failure envelope: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// Errors surfaced to callers through the envelope.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Body is not a JSON object with a string `crop`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Estimation failed after the request was accepted.
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

impl ServiceError {
    /// True when the caller sent a bad request rather than the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.to_string(),
        }
    }
}

/// Round to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a request body into a feature vector.
///
/// Numeric fields are not validated; only the envelope shape is.
pub fn parse_request(body: &[u8]) -> Result<FeatureVector, ServiceError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| ServiceError::InvalidRequest(format!("body is not valid JSON ({err})")))?;
    if !value.is_object() {
        return Err(ServiceError::InvalidRequest(
            "body must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| ServiceError::InvalidRequest(err.to_string()))
}

/// Build the success envelope for a scored request.
pub fn respond(input: &FeatureVector, result: &PredictionResult) -> PredictResponse {
    PredictResponse {
        predicted_crop: input.crop.clone(),
        predicted_yield: round2(result.predicted_yield),
        confidence: round2(result.confidence),
        best_model: result.best_model,
        feature_importances: result.feature_importances.clone(),
        model_metrics: result.model_metrics,
        data_sources: DATA_SOURCES,
        note: NOTE,
    }
}

/// Parse, estimate, and wrap one request. Failures are logged here.
pub fn handle_predict<S: RowStore>(
    estimator: &YieldEstimator<S>,
    body: &[u8],
) -> Result<PredictResponse, ServiceError> {
    let outcome = parse_request(body).and_then(|input| {
        let result = estimator.predict(&input)?;
        Ok(respond(&input, &result))
    });
    if let Err(err) = &outcome {
        if err.is_client_error() {
            tracing::warn!("Rejected prediction request: {err}");
        } else {
            tracing::error!("Prediction failed: {err}");
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::EstimatorSettings;
    use crate::store::{MemoryRowStore, PredictionRecord, ReferenceRow, StoreError};

    const WHEAT: &str = r#"{"crop":"wheat","temperature":30,"rainfall":900,"humidity":60,
        "soil_ph":6.5,"nitrogen":100,"phosphorus":40,"potassium":150}"#;

    struct BrokenStore;

    impl RowStore for BrokenStore {
        fn reference_rows(&self, _limit: usize) -> Result<Vec<ReferenceRow>, StoreError> {
            Err(StoreError::Busy)
        }

        fn append_prediction(&self, _record: &PredictionRecord) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(15.776_278), 15.78);
        assert_eq!(round2(0.654), 0.65);
        assert_eq!(round2(2.0), 2.0);
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn fallback_response_matches_reference_scenario() {
        let estimator = YieldEstimator::new(MemoryRowStore::default(), EstimatorSettings::default());
        let response = handle_predict(&estimator, WHEAT.as_bytes()).unwrap();
        assert_eq!(response.predicted_crop, "wheat");
        assert_eq!(response.predicted_yield, 15.78);
        assert_eq!(response.confidence, 0.65);
        assert_eq!(response.best_model, BestModel::EnhancedLinearRegression);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["best_model"], "Enhanced_Linear_Regression");
        assert_eq!(json["data_sources"].as_array().unwrap().len(), 3);
        assert_eq!(json["model_metrics"]["r2_score"], 0.79);
        assert_eq!(json["feature_importances"].as_object().unwrap().len(), 11);
        assert_eq!(json["note"], NOTE);
    }

    #[test]
    fn non_numeric_fields_serialize_as_null() {
        let rows = vec![ReferenceRow::observed(
            "rice",
            [25.0, 800.0, 60.0, 6.5, 90.0, 40.0, 120.0],
            4.0,
        )];
        let estimator = YieldEstimator::new(
            MemoryRowStore::new(rows),
            EstimatorSettings::default(),
        );
        let body = br#"{"crop":"rice","temperature":"hot","rainfall":800,"humidity":60,
            "soil_ph":6.5,"nitrogen":90,"phosphorus":40,"potassium":120}"#;
        let response = handle_predict(&estimator, body).unwrap();
        assert!(response.predicted_yield.is_nan());
        assert_eq!(response.confidence, 0.6);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["predicted_yield"].is_null());
    }

    #[test]
    fn malformed_bodies_are_client_errors() {
        let estimator = YieldEstimator::new(MemoryRowStore::default(), EstimatorSettings::default());
        for body in [
            &b"not json"[..],
            b"[1, 2, 3]",
            b"{\"temperature\": 20}",
            b"{\"crop\": 7}",
        ] {
            let err = handle_predict(&estimator, body).unwrap_err();
            assert!(err.is_client_error(), "{err}");
            assert!(err.envelope().error.starts_with("Invalid request"));
        }
        assert!(estimator.store().predictions().unwrap().is_empty());
    }

    #[test]
    fn retrieval_failure_is_server_error() {
        let estimator = YieldEstimator::new(BrokenStore, EstimatorSettings::default());
        let err = handle_predict(&estimator, WHEAT.as_bytes()).unwrap_err();
        assert!(!err.is_client_error());
        let envelope = serde_json::to_value(err.envelope()).unwrap();
        assert_eq!(
            envelope["error"],
            "Failed to load reference data: Database is busy, please retry"
        );
    }
}
