use chrono::{DateTime, Duration, TimeZone, Utc};
use polars::prelude::DataFrame;

use tsprep_core::error::{PipelineError, Stage};
use tsprep_core::frame;
use tsprep_core::outlier::{apply_outliers, detect_outliers};
use tsprep_core::types::{DataPoint, OutlierAction, OutlierMethod};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()
}

fn second_spaced(values: &[Option<f64>]) -> DataFrame {
    let start = base();
    let points: Vec<DataPoint> = values
        .iter()
        .enumerate()
        .map(|(idx, value)| DataPoint::new(start + Duration::seconds(idx as i64), *value))
        .collect();
    frame::points_to_frame(&points).expect("frame built")
}

fn values_of(df: &DataFrame) -> Vec<Option<f64>> {
    frame::frame_to_points(df)
        .expect("frame converted")
        .into_iter()
        .map(|point| point.value)
        .collect()
}

fn spiked() -> DataFrame {
    second_spaced(&[Some(1.0), Some(2.0), Some(100.0), Some(3.0)])
}

#[test]
fn zscore_replace_substitutes_median_of_survivors() {
    let outcome = apply_outliers(&spiked(), OutlierMethod::ZScore, 1.0, OutlierAction::Replace)
        .expect("outlier stage succeeded");

    assert_eq!(outcome.affected, 1);
    let values = values_of(&outcome.frame);
    assert_eq!(values.len(), 4);
    // median of the unflagged values 1, 2, 3
    assert_eq!(values[2], Some(2.0));
    assert_eq!(values[0], Some(1.0));
    assert_eq!(values[3], Some(3.0));
}

#[test]
fn zscore_remove_drops_flagged_points() {
    let outcome = apply_outliers(&spiked(), OutlierMethod::ZScore, 1.0, OutlierAction::Remove)
        .expect("outlier stage succeeded");

    assert_eq!(outcome.affected, 1);
    assert_eq!(
        values_of(&outcome.frame),
        vec![Some(1.0), Some(2.0), Some(3.0)]
    );

    let points = frame::frame_to_points(&outcome.frame).expect("frame converted");
    for pair in points.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}

#[test]
fn detect_returns_flagged_indices_without_touching_the_series() {
    let flagged =
        detect_outliers(&spiked(), OutlierMethod::ZScore, 1.0).expect("detection succeeded");
    assert_eq!(flagged, vec![2]);
}

#[test]
fn zero_variance_flags_nothing() {
    let df = second_spaced(&[Some(5.0), Some(5.0), Some(5.0), Some(5.0)]);
    let flagged = detect_outliers(&df, OutlierMethod::ZScore, 0.1).expect("detection succeeded");
    assert!(flagged.is_empty());
}

#[test]
fn fewer_than_two_known_values_flags_nothing() {
    let df = second_spaced(&[Some(5.0), None]);
    let flagged = detect_outliers(&df, OutlierMethod::ZScore, 0.1).expect("detection succeeded");
    assert!(flagged.is_empty());
}

#[test]
fn iqr_flags_points_outside_the_fences() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)]);
    let flagged = detect_outliers(&df, OutlierMethod::Iqr, 1.5).expect("detection succeeded");
    assert_eq!(flagged, vec![4]);
}

#[test]
fn nulls_are_never_flagged_or_removed() {
    let df = second_spaced(&[Some(1.0), None, Some(100.0), Some(2.0), Some(3.0)]);

    let flagged = detect_outliers(&df, OutlierMethod::ZScore, 1.0).expect("detection succeeded");
    assert_eq!(flagged, vec![2]);

    let outcome = apply_outliers(&df, OutlierMethod::ZScore, 1.0, OutlierAction::Remove)
        .expect("outlier stage succeeded");
    assert_eq!(
        values_of(&outcome.frame),
        vec![Some(1.0), None, Some(2.0), Some(3.0)]
    );
}

#[test]
fn non_positive_threshold_is_a_configuration_error() {
    let err = apply_outliers(&spiked(), OutlierMethod::ZScore, 0.0, OutlierAction::Remove)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Configuration {
            stage: Stage::Outlier,
            ..
        }
    ));
}

#[test]
fn empty_series_is_rejected() {
    let df = second_spaced(&[]);
    let err = detect_outliers(&df, OutlierMethod::ZScore, 3.0).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidInput {
            stage: Stage::Outlier,
            ..
        }
    ));
}
