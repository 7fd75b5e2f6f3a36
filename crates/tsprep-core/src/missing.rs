// crates/tsprep-core/src/missing.rs

use polars::prelude::DataFrame;

use crate::error::{PipelineError, Result, Stage};
use crate::frame;
use crate::types::InterpolationMethod;

/// Fills null values in the series. Interior gaps follow the requested
/// method; whatever remains at the edges afterwards is closed with a
/// forward then backward pass, so the output never contains nulls.
pub fn fill_missing(df: &DataFrame, method: InterpolationMethod) -> Result<DataFrame> {
    frame::ensure_strictly_increasing(df, Stage::Missing)?;

    let (timestamps, values) = frame::extract_parts(df)?;
    if values.iter().all(|value| value.is_none()) {
        return Err(PipelineError::invalid_input(
            Stage::Missing,
            "series contains no non-null values",
        ));
    }

    let mut filled = values;
    match method {
        InterpolationMethod::Linear => interpolate_linear(&mut filled),
        InterpolationMethod::ForwardFill => forward_fill(&mut filled),
        InterpolationMethod::BackwardFill => backward_fill(&mut filled),
    }
    forward_fill(&mut filled);
    backward_fill(&mut filled);

    frame::frame_from_parts(timestamps, filled)
}

/// Linear interpolation by position between the nearest known neighbors.
/// Edge gaps are left for the caller's fill passes.
pub(crate) fn interpolate_linear(values: &mut [Option<f64>]) {
    let mut last_known: Option<(usize, f64)> = None;
    for idx in 0..values.len() {
        let Some(current) = values[idx] else { continue };
        if let Some((prev_idx, prev_value)) = last_known {
            let gap = idx - prev_idx;
            if gap > 1 {
                let step = (current - prev_value) / gap as f64;
                for offset in 1..gap {
                    values[prev_idx + offset] = Some(prev_value + step * offset as f64);
                }
            }
        }
        last_known = Some((idx, current));
    }
}

pub(crate) fn forward_fill(values: &mut [Option<f64>]) {
    let mut last: Option<f64> = None;
    for slot in values.iter_mut() {
        match slot {
            Some(value) => last = Some(*value),
            None => *slot = last,
        }
    }
}

pub(crate) fn backward_fill(values: &mut [Option<f64>]) {
    let mut next: Option<f64> = None;
    for slot in values.iter_mut().rev() {
        match slot {
            Some(value) => next = Some(*value),
            None => *slot = next,
        }
    }
}
