//! axum router for the prediction service.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ErrorEnvelope, ServiceError, handle_predict};
use crate::dataset::{DatasetError, DatasetRepository, DirectorySource, RecordFilter};
use crate::estimator::YieldEstimator;
use crate::store::RowStore;

/// Shared handler state.
pub struct AppState<S> {
    estimator: Arc<Mutex<YieldEstimator<S>>>,
    dataset: Option<Arc<DatasetRepository<DirectorySource>>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            estimator: Arc::clone(&self.estimator),
            dataset: self.dataset.clone(),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(
        estimator: YieldEstimator<S>,
        dataset: Option<DatasetRepository<DirectorySource>>,
    ) -> Self {
        Self {
            estimator: Arc::new(Mutex::new(estimator)),
            dataset: dataset.map(Arc::new),
        }
    }
}

/// Build the service router.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: RowStore + Send + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/predict", post(predict::<S>))
        .route("/api/dataset/metadata", get(dataset_metadata::<S>))
        .route("/api/dataset/records", get(dataset_records::<S>))
        .route("/api/dataset/summary", get(dataset_summary::<S>))
        .with_state(state)
}

/// Serve the router on an already-bound listener until the task is dropped.
pub async fn serve<S>(listener: tokio::net::TcpListener, state: AppState<S>) -> std::io::Result<()>
where
    S: RowStore + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{addr}");
    }
    axum::serve(listener, router(state)).await
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    "OK"
}

/// POST /api/predict
async fn predict<S>(State(state): State<AppState<S>>, body: Bytes) -> Response
where
    S: RowStore + Send + 'static,
{
    let estimator = Arc::clone(&state.estimator);
    let outcome = tokio::task::spawn_blocking(move || {
        // A panic mid-request leaves the connection usable; keep serving.
        let guard = estimator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handle_predict(&guard, &body)
    })
    .await;
    match outcome {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(err)) => service_error(&err),
        Err(err) => {
            tracing::error!("Prediction task failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Prediction task failed")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordsQuery {
    crop: Option<String>,
    state: Option<String>,
}

/// GET /api/dataset/metadata
async fn dataset_metadata<S>(State(state): State<AppState<S>>) -> Response
where
    S: Send + 'static,
{
    with_dataset(state.dataset, |repo| repo.metadata().map(|meta| (*meta).clone())).await
}

/// GET /api/dataset/records?crop=&state=
async fn dataset_records<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<RecordsQuery>,
) -> Response
where
    S: Send + 'static,
{
    let filter = RecordFilter {
        crop: query.crop.filter(|value| !value.trim().is_empty()),
        state: query.state.filter(|value| !value.trim().is_empty()),
    };
    with_dataset(state.dataset, move |repo| repo.records(&filter)).await
}

/// GET /api/dataset/summary
async fn dataset_summary<S>(State(state): State<AppState<S>>) -> Response
where
    S: Send + 'static,
{
    with_dataset(state.dataset, |repo| repo.crop_summaries()).await
}

async fn with_dataset<T, F>(
    dataset: Option<Arc<DatasetRepository<DirectorySource>>>,
    query: F,
) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&DatasetRepository<DirectorySource>) -> Result<T, DatasetError> + Send + 'static,
{
    let Some(repo) = dataset else {
        return error_response(StatusCode::NOT_FOUND, "No dataset directory configured");
    };
    match tokio::task::spawn_blocking(move || query(repo.as_ref())).await {
        Ok(Ok(value)) => Json(value).into_response(),
        Ok(Err(err @ DatasetError::Missing(_))) => {
            error_response(StatusCode::NOT_FOUND, &err.to_string())
        }
        Ok(Err(err)) => {
            tracing::error!("Dataset query failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
        Err(err) => {
            tracing::error!("Dataset task failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Dataset task failed")
        }
    }
}

fn service_error(err: &ServiceError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(err.envelope())).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            error: message.to_string(),
        }),
    )
        .into_response()
}
