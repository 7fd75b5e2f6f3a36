use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;

use tsprep_core::error::PipelineError;
use tsprep_core::profile::SeriesProfile;
use tsprep_core::types::{
    AggregationMethod, EdgePolicy, FeatureConfig, GapPolicy, InterpolationMethod, OutlierAction,
    OutlierMethod, PipelineConfig, ResampleConfig, DEFAULT_OUTLIER_THRESHOLD,
};
use tsprep_repository::RepositoryError;
use tsprep_service::ServiceError;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/preprocess", post(preprocess))
        .route("/features", post(features))
        .route("/validate/{series_id}", get(validate))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PreprocessRequest {
    pub series_id: String,
    #[serde(default)]
    pub interpolation_method: InterpolationMethod,
    #[serde(default)]
    pub outlier_method: OutlierMethod,
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
    #[serde(default)]
    pub outlier_action: OutlierAction,
    /// Omitted means no resampling.
    pub resample_interval_seconds: Option<u64>,
    #[serde(default)]
    pub aggregation_method: AggregationMethod,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

fn default_outlier_threshold() -> f64 {
    DEFAULT_OUTLIER_THRESHOLD
}

impl PreprocessRequest {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            interpolation: self.interpolation_method,
            outlier_method: self.outlier_method,
            outlier_threshold: self.outlier_threshold,
            outlier_action: self.outlier_action,
            resample: self.resample_interval_seconds.map(|seconds| ResampleConfig {
                interval: Duration::seconds(seconds as i64),
                aggregation: self.aggregation_method,
                gap_policy: self.gap_policy,
            }),
            features: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub series_id: String,
    #[serde(default)]
    pub lags: Vec<usize>,
    #[serde(default)]
    pub windows: Vec<usize>,
    #[serde(default = "default_true")]
    pub include_time_features: bool,
    #[serde(default)]
    pub edge_policy: EdgePolicy,
}

fn default_true() -> bool {
    true
}

impl FeatureRequest {
    fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            lags: self.lags.clone(),
            windows: self.windows.clone(),
            include_time_features: self.include_time_features,
            edge_policy: self.edge_policy,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreprocessResponse {
    pub status: &'static str,
    pub series_id: String,
    pub data_points: usize,
    pub outliers_affected: usize,
}

#[derive(Debug, Serialize)]
pub struct FeatureResponse {
    pub status: &'static str,
    pub series_id: String,
    pub features: Vec<String>,
    pub rows: usize,
}

/// Service errors mapped onto HTTP statuses: caller mistakes are 400/404,
/// an unreachable database is 503, everything else 500.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Pipeline(
                PipelineError::InvalidInput { .. } | PipelineError::Configuration { .. },
            ) => StatusCode::BAD_REQUEST,
            ServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "service": "tsprep",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn preprocess(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreprocessRequest>,
) -> Result<Json<PreprocessResponse>, ApiError> {
    let config = request.pipeline_config();
    let summary = state
        .service
        .preprocess(&request.series_id, &config)
        .await
        .map_err(|err| {
            tracing::error!("preprocessing failed for series {}: {err}", request.series_id);
            ApiError::from(err)
        })?;

    Ok(Json(PreprocessResponse {
        status: "success",
        series_id: summary.series_id,
        data_points: summary.output_points,
        outliers_affected: summary.outliers_affected,
    }))
}

pub async fn features(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeatureRequest>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let config = request.feature_config();
    let summary = state
        .service
        .engineer_features(&request.series_id, &config)
        .await
        .map_err(|err| {
            tracing::error!(
                "feature engineering failed for series {}: {err}",
                request.series_id
            );
            ApiError::from(err)
        })?;

    Ok(Json(FeatureResponse {
        status: "success",
        series_id: summary.series_id,
        features: summary.columns,
        rows: summary.rows,
    }))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    Path(series_id): Path<String>,
) -> Result<Json<SeriesProfile>, ApiError> {
    let profile = state.service.validate(&series_id).await.map_err(|err| {
        tracing::error!("validation failed for series {series_id}: {err}");
        ApiError::from(err)
    })?;
    Ok(Json(profile))
}
