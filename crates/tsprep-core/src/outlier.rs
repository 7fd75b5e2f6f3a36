// crates/tsprep-core/src/outlier.rs

use polars::prelude::DataFrame;

use crate::error::{PipelineError, Result, Stage};
use crate::frame;
use crate::types::{OutlierAction, OutlierMethod};

#[derive(Debug)]
pub struct OutlierOutcome {
    pub frame: DataFrame,
    /// Number of points removed or replaced.
    pub affected: usize,
}

/// Returns the indices of statistically anomalous points without touching
/// the series. Null values are never flagged.
pub fn detect_outliers(df: &DataFrame, method: OutlierMethod, threshold: f64) -> Result<Vec<usize>> {
    frame::ensure_strictly_increasing(df, Stage::Outlier)?;
    ensure_threshold(threshold)?;

    let (_, values) = frame::extract_parts(df)?;
    let mask = outlier_mask(&values, method, threshold);
    Ok(mask
        .iter()
        .enumerate()
        .filter_map(|(idx, &flagged)| flagged.then_some(idx))
        .collect())
}

/// Removes or replaces anomalous points. Removal preserves the order of the
/// surviving timestamps; replacement substitutes the median of the
/// unflagged values and keeps the length unchanged.
pub fn apply_outliers(
    df: &DataFrame,
    method: OutlierMethod,
    threshold: f64,
    action: OutlierAction,
) -> Result<OutlierOutcome> {
    frame::ensure_strictly_increasing(df, Stage::Outlier)?;
    ensure_threshold(threshold)?;

    let (timestamps, values) = frame::extract_parts(df)?;
    let mask = outlier_mask(&values, method, threshold);
    let affected = mask.iter().filter(|&&flagged| flagged).count();

    let (timestamps, values) = match action {
        OutlierAction::Remove => {
            let mut kept_ts = Vec::with_capacity(timestamps.len() - affected);
            let mut kept_values = Vec::with_capacity(values.len() - affected);
            for (idx, flagged) in mask.iter().enumerate() {
                if !flagged {
                    kept_ts.push(timestamps[idx]);
                    kept_values.push(values[idx]);
                }
            }
            (kept_ts, kept_values)
        }
        OutlierAction::Replace => {
            let mut replaced = values;
            if affected > 0 {
                let unflagged: Vec<f64> = replaced
                    .iter()
                    .zip(&mask)
                    .filter_map(|(value, &flagged)| if flagged { None } else { *value })
                    .collect();
                if unflagged.is_empty() {
                    return Err(PipelineError::configuration(
                        Stage::Outlier,
                        format!(
                            "threshold {threshold} flags every value, nothing left to replace from"
                        ),
                    ));
                }
                let replacement = median(&unflagged);
                for (slot, flagged) in replaced.iter_mut().zip(&mask) {
                    if *flagged {
                        *slot = Some(replacement);
                    }
                }
            }
            (timestamps, replaced)
        }
    };

    Ok(OutlierOutcome {
        frame: frame::frame_from_parts(timestamps, values)?,
        affected,
    })
}

fn ensure_threshold(threshold: f64) -> Result<()> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(PipelineError::configuration(
            Stage::Outlier,
            format!("outlier threshold must be positive and finite, got {threshold}"),
        ));
    }
    Ok(())
}

fn outlier_mask(values: &[Option<f64>], method: OutlierMethod, threshold: f64) -> Vec<bool> {
    match method {
        OutlierMethod::ZScore => zscore_mask(values, threshold),
        OutlierMethod::Iqr => iqr_mask(values, threshold),
    }
}

/// |v - mean| / sample-std >= threshold. Degenerate inputs (fewer than two
/// known values, or zero variance) flag nothing.
fn zscore_mask(values: &[Option<f64>], threshold: f64) -> Vec<bool> {
    let known: Vec<f64> = values.iter().flatten().copied().collect();
    if known.len() < 2 {
        return vec![false; values.len()];
    }

    let mean = known.iter().sum::<f64>() / known.len() as f64;
    let variance = known
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (known.len() - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return vec![false; values.len()];
    }

    values
        .iter()
        .map(|value| match value {
            Some(value) => ((value - mean) / std).abs() >= threshold,
            None => false,
        })
        .collect()
}

/// Outside [Q1 - t*IQR, Q3 + t*IQR], quartiles by linear interpolation.
fn iqr_mask(values: &[Option<f64>], threshold: f64) -> Vec<bool> {
    let mut known: Vec<f64> = values.iter().flatten().copied().collect();
    if known.is_empty() {
        return vec![false; values.len()];
    }
    known.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&known, 0.25);
    let q3 = quantile(&known, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - threshold * iqr;
    let upper = q3 + threshold * iqr;

    values
        .iter()
        .map(|value| match value {
            Some(value) => *value < lower || *value > upper,
            None => false,
        })
        .collect()
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        sorted[low] + (sorted[high] - sorted[low]) * (rank - low as f64)
    }
}

/// Median of a non-empty slice.
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
