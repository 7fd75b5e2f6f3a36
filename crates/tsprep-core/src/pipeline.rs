// crates/tsprep-core/src/pipeline.rs

use polars::prelude::DataFrame;
use serde::Serialize;

use crate::error::Result;
use crate::features;
use crate::missing;
use crate::outlier;
use crate::resample;
use crate::types::PipelineConfig;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input_points: usize,
    pub outliers_affected: usize,
    pub resampled: bool,
    pub feature_columns: Vec<String>,
    pub output_points: usize,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub frame: DataFrame,
    pub report: PipelineReport,
}

/// Runs the stages strictly in sequence, each output feeding the next:
/// missing-value fill, outlier handling, then the optional resample and
/// feature-engineering steps. Identical to invoking the stages manually.
pub fn run_pipeline(df: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutcome> {
    config.validate()?;
    let input_points = df.height();

    // 1. fill missing values
    let filled = missing::fill_missing(df, config.interpolation)?;

    // 2. flag and remove/replace outliers
    let outcome = outlier::apply_outliers(
        &filled,
        config.outlier_method,
        config.outlier_threshold,
        config.outlier_action,
    )?;

    // 3. optional regular grid
    let (current, resampled) = match &config.resample {
        Some(resample_config) => (resample::resample(&outcome.frame, resample_config)?, true),
        None => (outcome.frame, false),
    };

    // 4. optional derived columns
    let (current, feature_columns) = match &config.features {
        Some(feature_config) => (
            features::engineer_features(&current, feature_config)?,
            features::feature_names(feature_config),
        ),
        None => (current, Vec::new()),
    };

    let report = PipelineReport {
        input_points,
        outliers_affected: outcome.affected,
        resampled,
        feature_columns,
        output_points: current.height(),
    };

    Ok(PipelineOutcome {
        frame: current,
        report,
    })
}
