// crates/tsprep-core/src/profile.rs

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::error::{PipelineError, Result, Stage};
use crate::frame;

#[derive(Debug, Clone, Serialize)]
pub struct ValueStats {
    pub mean: f64,
    /// Sample standard deviation; absent with fewer than two known values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesProfile {
    pub total_points: usize,
    pub missing_values: usize,
    pub missing_percentage: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Absent when every value is missing.
    pub stats: Option<ValueStats>,
}

/// Data-quality summary of a series: counts, time range, value stats.
/// Unlike the pipeline stages this accepts unordered input, since its job
/// is to describe data as found.
pub fn profile_series(df: &DataFrame) -> Result<SeriesProfile> {
    if df.height() == 0 {
        return Err(PipelineError::invalid_input(
            Stage::Profile,
            "input series is empty",
        ));
    }

    let (timestamps, values) = frame::extract_parts(df)?;

    let total_points = values.len();
    let known: Vec<f64> = values.iter().flatten().copied().collect();
    let missing_values = total_points - known.len();
    let missing_percentage = missing_values as f64 / total_points as f64 * 100.0;

    let start_micros = timestamps.iter().copied().min().unwrap_or(timestamps[0]);
    let end_micros = timestamps.iter().copied().max().unwrap_or(timestamps[0]);

    let stats = if known.is_empty() {
        None
    } else {
        let mean = known.iter().sum::<f64>() / known.len() as f64;
        let std = if known.len() < 2 {
            None
        } else {
            let variance = known
                .iter()
                .map(|value| (value - mean).powi(2))
                .sum::<f64>()
                / (known.len() - 1) as f64;
            Some(variance.sqrt())
        };
        Some(ValueStats {
            mean,
            std,
            min: known.iter().copied().fold(f64::INFINITY, f64::min),
            max: known.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    };

    Ok(SeriesProfile {
        total_points,
        missing_values,
        missing_percentage,
        start: frame::micros_to_datetime(start_micros)?,
        end: frame::micros_to_datetime(end_micros)?,
        stats,
    })
}
