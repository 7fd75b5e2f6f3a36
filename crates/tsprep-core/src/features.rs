// crates/tsprep-core/src/features.rs

use chrono::{DateTime, Datelike, Timelike, Utc};
use polars::prelude::*;
use serde_json::{Map, Number, Value};

use crate::error::{PipelineError, Result, Stage};
use crate::frame::{self, TIMESTAMP_COL};
use crate::types::{EdgePolicy, FeatureConfig};

/// One augmented row, ready for persistence: the original value plus the
/// derived fields as a JSON object.
#[derive(Debug, Clone)]
pub struct FeatureRowValues {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
    pub features: Map<String, Value>,
}

const TIME_FEATURE_NAMES: [&str; 7] = [
    "hour",
    "day_of_week",
    "day_of_month",
    "month",
    "quarter",
    "year",
    "is_weekend",
];

/// Column names the given config produces, in output order.
pub fn feature_names(config: &FeatureConfig) -> Vec<String> {
    let mut names = Vec::new();
    for lag in &config.lags {
        names.push(format!("lag_{lag}"));
    }
    for window in &config.windows {
        names.push(format!("rolling_mean_{window}"));
        names.push(format!("rolling_std_{window}"));
        names.push(format!("rolling_min_{window}"));
        names.push(format!("rolling_max_{window}"));
    }
    if config.include_time_features {
        names.extend(TIME_FEATURE_NAMES.iter().map(|name| name.to_string()));
    }
    names
}

/// Augments the series with the requested lag, rolling, and time-derived
/// columns. Lag and rolling columns only ever read values at or before the
/// row they are computed for.
pub fn engineer_features(df: &DataFrame, config: &FeatureConfig) -> Result<DataFrame> {
    frame::ensure_strictly_increasing(df, Stage::Features)?;
    config.validate()?;

    let (timestamps, values) = frame::extract_parts(df)?;
    let len = values.len();

    for &lag in &config.lags {
        if lag > len {
            return Err(PipelineError::configuration(
                Stage::Features,
                format!("lag {lag} exceeds the series length of {len}"),
            ));
        }
    }
    for &window in &config.windows {
        if window > len {
            return Err(PipelineError::configuration(
                Stage::Features,
                format!("rolling window {window} exceeds the series length of {len}"),
            ));
        }
    }

    let mut float_columns: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    let mut int_columns: Vec<(String, Vec<i32>)> = Vec::new();

    for &lag in &config.lags {
        float_columns.push((format!("lag_{lag}"), lag_column(&values, lag)));
    }
    for &window in &config.windows {
        let rolling = rolling_columns(&values, window);
        float_columns.push((format!("rolling_mean_{window}"), rolling.mean));
        float_columns.push((format!("rolling_std_{window}"), rolling.std));
        float_columns.push((format!("rolling_min_{window}"), rolling.min));
        float_columns.push((format!("rolling_max_{window}"), rolling.max));
    }
    if config.include_time_features {
        for (name, column) in time_columns(&timestamps)? {
            int_columns.push((name, column));
        }
    }

    // Leading rows without full history for every requested lag/window.
    let max_lag = config.lags.iter().copied().max().unwrap_or(0);
    let max_window = config.windows.iter().copied().max().unwrap_or(0);
    let warmup = max_lag.max(max_window.saturating_sub(1));
    let skip = match config.edge_policy {
        EdgePolicy::DropIncomplete => warmup,
        EdgePolicy::FillNull => 0,
    };

    let mut output = frame::frame_from_parts(
        timestamps[skip..].to_vec(),
        values[skip..].to_vec(),
    )?;

    let mut columns: Vec<Column> = Vec::new();
    for (name, column) in float_columns {
        columns.push(Series::new(name.into(), column[skip..].to_vec()).into());
    }
    for (name, column) in int_columns {
        columns.push(Series::new(name.into(), column[skip..].to_vec()).into());
    }
    output.hstack_mut(columns.as_mut_slice())?;

    Ok(output)
}

/// Extracts the derived columns of an augmented frame row by row, for
/// persistence as one JSON object per timestamp.
pub fn collect_feature_rows(df: &DataFrame, names: &[String]) -> Result<Vec<FeatureRowValues>> {
    let timestamps = df.column(TIMESTAMP_COL)?.datetime()?;
    let values = df.column(frame::VALUE_COL)?.f64()?;

    enum FeatureCol<'a> {
        Float(&'a Float64Chunked),
        Int(&'a Int32Chunked),
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let column = df.column(name.as_str())?;
        let extracted = match column.dtype() {
            DataType::Float64 => FeatureCol::Float(column.f64()?),
            DataType::Int32 => FeatureCol::Int(column.i32()?),
            other => {
                return Err(PipelineError::Processing(format!(
                    "feature column '{name}' has unsupported dtype {other}"
                )))
            }
        };
        columns.push((name.as_str(), extracted));
    }

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let Some(micros) = timestamps.get(idx) else {
            return Err(PipelineError::Processing(format!(
                "timestamp at index {idx} is null"
            )));
        };

        let mut features = Map::new();
        for (name, column) in &columns {
            let entry = match column {
                FeatureCol::Float(chunked) => chunked
                    .get(idx)
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                FeatureCol::Int(chunked) => chunked
                    .get(idx)
                    .map(|value| Value::Number(Number::from(value)))
                    .unwrap_or(Value::Null),
            };
            features.insert(name.to_string(), entry);
        }

        rows.push(FeatureRowValues {
            timestamp: frame::micros_to_datetime(micros)?,
            value: values.get(idx),
            features,
        });
    }
    Ok(rows)
}

fn lag_column(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|idx| if idx < lag { None } else { values[idx - lag] })
        .collect()
}

struct RollingColumns {
    mean: Vec<Option<f64>>,
    std: Vec<Option<f64>>,
    min: Vec<Option<f64>>,
    max: Vec<Option<f64>>,
}

/// Trailing window of `window` points including the current one. A window
/// with insufficient history or any null value produces null.
fn rolling_columns(values: &[Option<f64>], window: usize) -> RollingColumns {
    let len = values.len();
    let mut out = RollingColumns {
        mean: vec![None; len],
        std: vec![None; len],
        min: vec![None; len],
        max: vec![None; len],
    };

    for idx in (window - 1)..len {
        let slice = &values[idx + 1 - window..=idx];
        if slice.iter().any(|value| value.is_none()) {
            continue;
        }
        let window_values: Vec<f64> = slice.iter().flatten().copied().collect();

        let mean = window_values.iter().sum::<f64>() / window as f64;
        let variance = window_values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (window - 1) as f64;
        let min = window_values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window_values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        out.mean[idx] = Some(mean);
        out.std[idx] = Some(variance.sqrt());
        out.min[idx] = Some(min);
        out.max[idx] = Some(max);
    }
    out
}

fn time_columns(timestamps: &[i64]) -> Result<Vec<(String, Vec<i32>)>> {
    let len = timestamps.len();
    let mut hour = Vec::with_capacity(len);
    let mut day_of_week = Vec::with_capacity(len);
    let mut day_of_month = Vec::with_capacity(len);
    let mut month = Vec::with_capacity(len);
    let mut quarter = Vec::with_capacity(len);
    let mut year = Vec::with_capacity(len);
    let mut is_weekend = Vec::with_capacity(len);

    for &micros in timestamps {
        let timestamp = frame::micros_to_datetime(micros)?;
        let weekday = timestamp.weekday().num_days_from_monday() as i32;
        hour.push(timestamp.hour() as i32);
        day_of_week.push(weekday);
        day_of_month.push(timestamp.day() as i32);
        month.push(timestamp.month() as i32);
        quarter.push(timestamp.month0() as i32 / 3 + 1);
        year.push(timestamp.year());
        is_weekend.push(i32::from(weekday >= 5));
    }

    Ok(vec![
        ("hour".to_string(), hour),
        ("day_of_week".to_string(), day_of_week),
        ("day_of_month".to_string(), day_of_month),
        ("month".to_string(), month),
        ("quarter".to_string(), quarter),
        ("year".to_string(), year),
        ("is_weekend".to_string(), is_weekend),
    ])
}
