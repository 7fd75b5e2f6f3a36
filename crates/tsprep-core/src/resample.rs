// crates/tsprep-core/src/resample.rs

use polars::prelude::DataFrame;

use crate::error::{PipelineError, Result, Stage};
use crate::frame;
use crate::missing;
use crate::outlier;
use crate::types::{AggregationMethod, GapPolicy, ResampleConfig};

/// Finest supported grid: one second.
pub const MIN_RESAMPLE_INTERVAL_MICROS: i64 = 1_000_000;

/// Aggregates the series onto a regular grid. Bucket k covers
/// `[t0 + k*interval, t0 + (k+1)*interval)`; the grid always contains the
/// first and last input point, and output timestamps are the bucket starts.
/// Buckets that received no observations follow the configured gap policy.
pub fn resample(df: &DataFrame, config: &ResampleConfig) -> Result<DataFrame> {
    frame::ensure_strictly_increasing(df, Stage::Resample)?;

    let interval = config.interval.num_microseconds().ok_or_else(|| {
        PipelineError::configuration(Stage::Resample, "resample interval overflows")
    })?;
    if interval < MIN_RESAMPLE_INTERVAL_MICROS {
        return Err(PipelineError::configuration(
            Stage::Resample,
            format!(
                "interval of {interval}us is finer than the minimum resolution of {}s",
                MIN_RESAMPLE_INTERVAL_MICROS / 1_000_000
            ),
        ));
    }

    let (timestamps, values) = frame::extract_parts(df)?;
    let start = timestamps[0];
    let end = timestamps[timestamps.len() - 1];
    let span = end - start;
    if interval > span {
        return Err(PipelineError::configuration(
            Stage::Resample,
            format!(
                "interval of {}s exceeds the input span of {}s",
                interval / 1_000_000,
                span / 1_000_000
            ),
        ));
    }

    let bucket_count = (span / interval) as usize + 1;
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); bucket_count];
    for (ts, value) in timestamps.iter().zip(&values) {
        let Some(value) = value else { continue };
        let idx = ((ts - start) / interval) as usize;
        buckets[idx].push(*value);
    }

    let mut aggregated: Vec<Option<f64>> = buckets
        .iter()
        .map(|bucket| aggregate(bucket, config.aggregation))
        .collect();
    apply_gap_policy(&mut aggregated, config.gap_policy);

    let grid: Vec<i64> = (0..bucket_count)
        .map(|k| start + k as i64 * interval)
        .collect();
    frame::frame_from_parts(grid, aggregated)
}

fn aggregate(bucket: &[f64], method: AggregationMethod) -> Option<f64> {
    if bucket.is_empty() {
        return None;
    }
    let value = match method {
        AggregationMethod::Mean => bucket.iter().sum::<f64>() / bucket.len() as f64,
        AggregationMethod::Sum => bucket.iter().sum(),
        AggregationMethod::Min => bucket.iter().copied().fold(f64::INFINITY, f64::min),
        AggregationMethod::Max => bucket.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationMethod::Median => outlier::median(bucket),
        AggregationMethod::Last => bucket[bucket.len() - 1],
    };
    Some(value)
}

// With non-null input the first and last bucket hold the first and last
// point, so gaps are interior and interpolation has neighbors on both
// sides. Edge gaps from null-only buckets stay null under Interpolate.
fn apply_gap_policy(values: &mut [Option<f64>], policy: GapPolicy) {
    match policy {
        GapPolicy::ForwardFill => missing::forward_fill(values),
        GapPolicy::Interpolate => missing::interpolate_linear(values),
        GapPolicy::MarkMissing => {}
    }
}
