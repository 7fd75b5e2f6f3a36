// crates/tsprep-core/src/types.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result, Stage};

/// A single timestamped observation. `None` marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// An ordered sequence of timestamped observations for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub series_id: String,
    pub points: Vec<DataPoint>,
    #[serde(default)]
    pub metadata: Value,
}

impl TimeSeries {
    pub fn new(series_id: impl Into<String>, points: Vec<DataPoint>) -> Self {
        Self {
            series_id: series_id.into(),
            points,
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    Linear,
    #[serde(alias = "ffill")]
    ForwardFill,
    #[serde(alias = "bfill")]
    BackwardFill,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::ForwardFill => "forward_fill",
            InterpolationMethod::BackwardFill => "backward_fill",
        }
    }
}

impl Default for InterpolationMethod {
    fn default() -> Self {
        InterpolationMethod::Linear
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierMethod {
    #[serde(rename = "zscore")]
    ZScore,
    #[serde(rename = "iqr")]
    Iqr,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierMethod::ZScore => "zscore",
            OutlierMethod::Iqr => "iqr",
        }
    }
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::ZScore
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierAction {
    Remove,
    Replace,
}

impl OutlierAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierAction::Remove => "remove",
            OutlierAction::Replace => "replace",
        }
    }
}

impl Default for OutlierAction {
    fn default() -> Self {
        OutlierAction::Remove
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Mean,
    Sum,
    Min,
    Max,
    Median,
    Last,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Mean => "mean",
            AggregationMethod::Sum => "sum",
            AggregationMethod::Min => "min",
            AggregationMethod::Max => "max",
            AggregationMethod::Median => "median",
            AggregationMethod::Last => "last",
        }
    }
}

impl Default for AggregationMethod {
    fn default() -> Self {
        AggregationMethod::Mean
    }
}

/// What a resampled grid does with buckets that received no observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    ForwardFill,
    Interpolate,
    MarkMissing,
}

impl GapPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapPolicy::ForwardFill => "forward_fill",
            GapPolicy::Interpolate => "interpolate",
            GapPolicy::MarkMissing => "mark_missing",
        }
    }
}

impl Default for GapPolicy {
    fn default() -> Self {
        GapPolicy::ForwardFill
    }
}

/// What feature engineering does with leading rows that lack the history a
/// requested lag or window needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    DropIncomplete,
    FillNull,
}

impl EdgePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgePolicy::DropIncomplete => "drop_incomplete",
            EdgePolicy::FillNull => "fill_null",
        }
    }
}

impl Default for EdgePolicy {
    fn default() -> Self {
        EdgePolicy::FillNull
    }
}

pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct ResampleConfig {
    pub interval: Duration,
    pub aggregation: AggregationMethod,
    pub gap_policy: GapPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureConfig {
    pub lags: Vec<usize>,
    pub windows: Vec<usize>,
    pub include_time_features: bool,
    pub edge_policy: EdgePolicy,
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(lag) = self.lags.iter().find(|&&lag| lag < 1) {
            return Err(PipelineError::configuration(
                Stage::Features,
                format!("lag values must be positive integers, got {lag}"),
            ));
        }
        if let Some(window) = self.windows.iter().find(|&&window| window < 2) {
            return Err(PipelineError::configuration(
                Stage::Features,
                format!("rolling window sizes must be at least 2, got {window}"),
            ));
        }
        Ok(())
    }
}

/// Configuration for one full preprocessing run. Resampling and feature
/// engineering are optional steps; missing-value and outlier handling
/// always run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub interpolation: InterpolationMethod,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub outlier_action: OutlierAction,
    pub resample: Option<ResampleConfig>,
    pub features: Option<FeatureConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMethod::default(),
            outlier_method: OutlierMethod::default(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            outlier_action: OutlierAction::default(),
            resample: None,
            features: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0) {
            return Err(PipelineError::configuration(
                Stage::Outlier,
                format!(
                    "outlier threshold must be positive and finite, got {}",
                    self.outlier_threshold
                ),
            ));
        }
        if let Some(features) = &self.features {
            features.validate()?;
        }
        Ok(())
    }
}
