use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use tsprep_core::error::PipelineError;
use tsprep_core::features;
use tsprep_core::frame;
use tsprep_core::pipeline;
use tsprep_core::profile::{self, SeriesProfile};
use tsprep_core::types::{FeatureConfig, PipelineConfig, TimeSeries};
use tsprep_repository::{FeatureRow, RepositoryError, SeriesRepository};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug, Clone, Serialize)]
pub struct PreprocessSummary {
    pub series_id: String,
    pub input_points: usize,
    pub output_points: usize,
    pub outliers_affected: usize,
    pub resampled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureSummary {
    pub series_id: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

/// Orchestrates one pipeline run per request: fetch, transform, persist.
/// Holds no mutable state, so invocations are independently schedulable.
pub struct PreprocessingService {
    repository: Arc<dyn SeriesRepository>,
}

impl PreprocessingService {
    pub fn new(repository: Arc<dyn SeriesRepository>) -> Self {
        Self { repository }
    }

    pub async fn preprocess(
        &self,
        series_id: &str,
        config: &PipelineConfig,
    ) -> Result<PreprocessSummary, ServiceError> {
        info!("starting preprocessing for series {series_id}");

        let raw = self.repository.fetch_raw(series_id).await?;
        info!("retrieved {} raw points for series {series_id}", raw.len());

        let input = frame::series_to_frame(&raw)?;
        let outcome = pipeline::run_pipeline(&input, config)?;
        info!(
            "pipeline finished for series {series_id}: {} outliers {} using {}, {} output points",
            outcome.report.outliers_affected,
            config.outlier_action.as_str(),
            config.outlier_method.as_str(),
            outcome.report.output_points
        );

        let processed = TimeSeries {
            series_id: series_id.to_string(),
            points: frame::frame_to_points(&outcome.frame)?,
            metadata: raw.metadata.clone(),
        };
        self.repository.save_preprocessed(&processed).await?;
        info!("saved preprocessed series {series_id}");

        Ok(PreprocessSummary {
            series_id: series_id.to_string(),
            input_points: outcome.report.input_points,
            output_points: outcome.report.output_points,
            outliers_affected: outcome.report.outliers_affected,
            resampled: outcome.report.resampled,
        })
    }

    pub async fn engineer_features(
        &self,
        series_id: &str,
        config: &FeatureConfig,
    ) -> Result<FeatureSummary, ServiceError> {
        info!("creating features for series {series_id}");

        let series = match self.repository.fetch_preprocessed(series_id).await {
            Ok(series) => series,
            Err(RepositoryError::NotFound(_)) => {
                info!("no preprocessed data for series {series_id}, falling back to raw");
                self.repository.fetch_raw(series_id).await?
            }
            Err(err) => return Err(err.into()),
        };

        let input = frame::series_to_frame(&series)?;
        let augmented = features::engineer_features(&input, config)?;
        let columns = features::feature_names(config);

        let feature_rows: Vec<FeatureRow> = features::collect_feature_rows(&augmented, &columns)?
            .into_iter()
            .map(|row| FeatureRow {
                timestamp: row.timestamp,
                value: row.value,
                features: Value::Object(row.features),
            })
            .collect();
        self.repository.save_features(series_id, &feature_rows).await?;
        info!(
            "saved {} feature columns over {} rows for series {series_id}",
            columns.len(),
            feature_rows.len()
        );

        Ok(FeatureSummary {
            series_id: series_id.to_string(),
            columns,
            rows: feature_rows.len(),
        })
    }

    pub async fn validate(&self, series_id: &str) -> Result<SeriesProfile, ServiceError> {
        info!("validating series {series_id}");
        let raw = self.repository.fetch_raw(series_id).await?;
        let input = frame::series_to_frame(&raw)?;
        let profile = profile::profile_series(&input)?;
        info!(
            "series {series_id}: {} points, {} missing",
            profile.total_points, profile.missing_values
        );
        Ok(profile)
    }
}
