// crates/tsprep-core/src/frame.rs
//
// Conversion between the `TimeSeries` domain model and the polars frame
// representation the pipeline stages operate on.

use chrono::{DateTime, Utc};
use polars::prelude::*;

use crate::error::{PipelineError, Result, Stage};
use crate::types::{DataPoint, TimeSeries};

pub const TIMESTAMP_COL: &str = "timestamp";
pub const VALUE_COL: &str = "value";

pub fn series_to_frame(series: &TimeSeries) -> Result<DataFrame> {
    points_to_frame(&series.points)
}

pub fn points_to_frame(points: &[DataPoint]) -> Result<DataFrame> {
    let timestamps: Vec<i64> = points
        .iter()
        .map(|point| point.timestamp.timestamp_micros())
        .collect();
    let values: Vec<Option<f64>> = points.iter().map(|point| point.value).collect();
    frame_from_parts(timestamps, values)
}

pub fn frame_to_points(df: &DataFrame) -> Result<Vec<DataPoint>> {
    let (timestamps, values) = extract_parts(df)?;

    let mut points = Vec::with_capacity(timestamps.len());
    for (micros, value) in timestamps.into_iter().zip(values) {
        let timestamp = micros_to_datetime(micros)?;
        points.push(DataPoint { timestamp, value });
    }
    Ok(points)
}

/// Rejects empty frames and frames whose timestamps are not strictly
/// increasing. Every stage calls this on its input.
pub fn ensure_strictly_increasing(df: &DataFrame, stage: Stage) -> Result<()> {
    if df.height() == 0 {
        return Err(PipelineError::invalid_input(stage, "input series is empty"));
    }

    let timestamps = df.column(TIMESTAMP_COL)?.datetime()?;
    let mut previous: Option<i64> = None;
    for idx in 0..df.height() {
        let Some(current) = timestamps.get(idx) else {
            return Err(PipelineError::invalid_input(
                stage,
                format!("timestamp at index {idx} is null"),
            ));
        };
        if let Some(prev) = previous {
            if current <= prev {
                return Err(PipelineError::invalid_input(
                    stage,
                    format!("timestamps are not strictly increasing at index {idx}"),
                ));
            }
        }
        previous = Some(current);
    }
    Ok(())
}

pub(crate) fn extract_parts(df: &DataFrame) -> Result<(Vec<i64>, Vec<Option<f64>>)> {
    let timestamps = df.column(TIMESTAMP_COL)?.datetime()?;
    let values = df.column(VALUE_COL)?.f64()?;

    let mut ts_out = Vec::with_capacity(df.height());
    let mut value_out = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let Some(micros) = timestamps.get(idx) else {
            return Err(PipelineError::Processing(format!(
                "timestamp at index {idx} is null"
            )));
        };
        ts_out.push(micros);
        value_out.push(values.get(idx));
    }
    Ok((ts_out, value_out))
}

pub(crate) fn frame_from_parts(
    timestamps: Vec<i64>,
    values: Vec<Option<f64>>,
) -> Result<DataFrame> {
    let timestamp_series = Series::new(TIMESTAMP_COL.into(), timestamps).cast(
        &DataType::Datetime(TimeUnit::Microseconds, Some(polars::prelude::TimeZone::UTC)),
    )?;
    let value_series = Series::new(VALUE_COL.into(), values);

    Ok(DataFrame::new(vec![
        timestamp_series.into(),
        value_series.into(),
    ])?)
}

pub(crate) fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        PipelineError::Processing(format!("timestamp {micros}us is out of range"))
    })
}
