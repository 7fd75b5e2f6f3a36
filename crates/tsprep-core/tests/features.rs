use chrono::{DateTime, Duration, TimeZone, Utc};
use polars::prelude::DataFrame;

use tsprep_core::error::{PipelineError, Stage};
use tsprep_core::features::{collect_feature_rows, engineer_features, feature_names};
use tsprep_core::frame;
use tsprep_core::types::{DataPoint, EdgePolicy, FeatureConfig};

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

fn float_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    let column = df.column(name).expect("column present");
    let chunked = column.f64().expect("float column");
    (0..df.height()).map(|idx| chunked.get(idx)).collect()
}

fn int_column(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
    let column = df.column(name).expect("column present");
    let chunked = column.i32().expect("int column");
    (0..df.height()).map(|idx| chunked.get(idx)).collect()
}

fn lags_and_windows(lags: Vec<usize>, windows: Vec<usize>) -> FeatureConfig {
    FeatureConfig {
        lags,
        windows,
        include_time_features: false,
        edge_policy: EdgePolicy::FillNull,
    }
}

#[test]
fn lag_columns_shift_values_into_the_past() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    let out = engineer_features(&df, &lags_and_windows(vec![1], vec![]))
        .expect("feature stage succeeded");

    assert_eq!(
        float_column(&out, "lag_1"),
        vec![None, Some(1.0), Some(2.0), Some(3.0)]
    );
}

#[test]
fn rolling_statistics_cover_the_trailing_window() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    let out = engineer_features(&df, &lags_and_windows(vec![], vec![2]))
        .expect("feature stage succeeded");

    assert_eq!(
        float_column(&out, "rolling_mean_2"),
        vec![None, Some(1.5), Some(2.5), Some(3.5)]
    );
    assert_eq!(
        float_column(&out, "rolling_min_2"),
        vec![None, Some(1.0), Some(2.0), Some(3.0)]
    );
    assert_eq!(
        float_column(&out, "rolling_max_2"),
        vec![None, Some(2.0), Some(3.0), Some(4.0)]
    );

    let std = float_column(&out, "rolling_std_2");
    assert!(std[0].is_none());
    // sample std of two values one apart
    let expected = (0.5f64).sqrt();
    for entry in std.iter().skip(1) {
        assert!((entry.unwrap() - expected).abs() < 1e-12);
    }
}

#[test]
fn windows_containing_nulls_produce_null() {
    let df = second_spaced(&[Some(1.0), None, Some(3.0), Some(4.0)]);
    let out = engineer_features(&df, &lags_and_windows(vec![], vec![2]))
        .expect("feature stage succeeded");

    assert_eq!(
        float_column(&out, "rolling_mean_2"),
        vec![None, None, None, Some(3.5)]
    );
}

#[test]
fn time_features_derive_from_each_timestamp() {
    // 2025-03-01 is a Saturday, 2025-03-03 a Monday
    let points = vec![
        DataPoint::new(Utc.with_ymd_and_hms(2025, 3, 1, 5, 0, 0).unwrap(), Some(1.0)),
        DataPoint::new(
            Utc.with_ymd_and_hms(2025, 3, 3, 23, 30, 0).unwrap(),
            Some(2.0),
        ),
    ];
    let df = frame::points_to_frame(&points).expect("frame built");
    let config = FeatureConfig {
        lags: vec![],
        windows: vec![],
        include_time_features: true,
        edge_policy: EdgePolicy::FillNull,
    };
    let out = engineer_features(&df, &config).expect("feature stage succeeded");

    assert_eq!(int_column(&out, "hour"), vec![Some(5), Some(23)]);
    assert_eq!(int_column(&out, "day_of_week"), vec![Some(5), Some(0)]);
    assert_eq!(int_column(&out, "day_of_month"), vec![Some(1), Some(3)]);
    assert_eq!(int_column(&out, "month"), vec![Some(3), Some(3)]);
    assert_eq!(int_column(&out, "quarter"), vec![Some(1), Some(1)]);
    assert_eq!(int_column(&out, "year"), vec![Some(2025), Some(2025)]);
    assert_eq!(int_column(&out, "is_weekend"), vec![Some(1), Some(0)]);
}

#[test]
fn drop_incomplete_removes_rows_without_full_history() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
    let config = FeatureConfig {
        lags: vec![2],
        windows: vec![3],
        include_time_features: false,
        edge_policy: EdgePolicy::DropIncomplete,
    };
    let out = engineer_features(&df, &config).expect("feature stage succeeded");

    assert_eq!(out.height(), 3);
    let points = frame::frame_to_points(&out).expect("frame converted");
    assert_eq!(points[0].timestamp, base() + Duration::seconds(2));
    assert_eq!(float_column(&out, "lag_2"), vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(
        float_column(&out, "rolling_mean_3"),
        vec![Some(2.0), Some(3.0), Some(4.0)]
    );
}

#[test]
fn features_never_read_past_their_own_row() {
    let head = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
    let mut changed = head;
    changed[3] = Some(400.0);

    let config = lags_and_windows(vec![1], vec![2]);
    let out_a = engineer_features(&second_spaced(&head), &config).expect("feature stage");
    let out_b = engineer_features(&second_spaced(&changed), &config).expect("feature stage");

    for name in ["lag_1", "rolling_mean_2", "rolling_std_2"] {
        let a = float_column(&out_a, name);
        let b = float_column(&out_b, name);
        // everything before the altered observation is untouched
        assert_eq!(a[..3], b[..3], "column {name}");
    }
}

#[test]
fn feature_names_follow_output_order() {
    let config = FeatureConfig {
        lags: vec![1, 7],
        windows: vec![3],
        include_time_features: true,
        edge_policy: EdgePolicy::FillNull,
    };
    assert_eq!(
        feature_names(&config),
        vec![
            "lag_1",
            "lag_7",
            "rolling_mean_3",
            "rolling_std_3",
            "rolling_min_3",
            "rolling_max_3",
            "hour",
            "day_of_week",
            "day_of_month",
            "month",
            "quarter",
            "year",
            "is_weekend",
        ]
    );
}

#[test]
fn collect_feature_rows_serializes_each_row() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(3.0)]);
    let config = lags_and_windows(vec![1], vec![]);
    let out = engineer_features(&df, &config).expect("feature stage succeeded");

    let rows =
        collect_feature_rows(&out, &feature_names(&config)).expect("rows collected");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].value, Some(1.0));
    assert!(rows[0].features["lag_1"].is_null());
    assert_eq!(rows[1].features["lag_1"].as_f64(), Some(1.0));
    assert_eq!(rows[2].features["lag_1"].as_f64(), Some(2.0));
}

#[test]
fn lag_exceeding_the_series_length_is_rejected() {
    let df = second_spaced(&[Some(1.0), Some(2.0)]);
    let err = engineer_features(&df, &lags_and_windows(vec![5], vec![])).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Configuration {
            stage: Stage::Features,
            ..
        }
    ));
}

#[test]
fn window_exceeding_the_series_length_is_rejected() {
    let df = second_spaced(&[Some(1.0), Some(2.0)]);
    let err = engineer_features(&df, &lags_and_windows(vec![], vec![3])).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Configuration {
            stage: Stage::Features,
            ..
        }
    ));
}

#[test]
fn degenerate_lags_and_windows_are_rejected() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(3.0)]);

    let err = engineer_features(&df, &lags_and_windows(vec![0], vec![])).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { .. }));

    let err = engineer_features(&df, &lags_and_windows(vec![], vec![1])).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { .. }));
}
