use chrono::{DateTime, Duration, TimeZone, Utc};
use polars::prelude::DataFrame;

use tsprep_core::error::PipelineError;
use tsprep_core::features::engineer_features;
use tsprep_core::frame;
use tsprep_core::missing::fill_missing;
use tsprep_core::outlier::apply_outliers;
use tsprep_core::pipeline::run_pipeline;
use tsprep_core::resample::resample;
use tsprep_core::types::{
    AggregationMethod, DataPoint, EdgePolicy, FeatureConfig, GapPolicy, InterpolationMethod,
    OutlierAction, OutlierMethod, PipelineConfig, ResampleConfig,
};

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

fn full_config() -> PipelineConfig {
    PipelineConfig {
        interpolation: InterpolationMethod::Linear,
        outlier_method: OutlierMethod::ZScore,
        outlier_threshold: 1.0,
        outlier_action: OutlierAction::Replace,
        resample: Some(ResampleConfig {
            interval: Duration::seconds(2),
            aggregation: AggregationMethod::Mean,
            gap_policy: GapPolicy::ForwardFill,
        }),
        features: Some(FeatureConfig {
            lags: vec![1],
            windows: vec![2],
            include_time_features: false,
            edge_policy: EdgePolicy::FillNull,
        }),
    }
}

#[test]
fn composed_pipeline_equals_manual_stage_by_stage_run() {
    let df = second_spaced(&[Some(1.0), None, Some(100.0), Some(3.0)]);
    let config = full_config();

    let outcome = run_pipeline(&df, &config).expect("pipeline succeeded");

    let filled = fill_missing(&df, config.interpolation).expect("missing stage");
    let cleaned = apply_outliers(
        &filled,
        config.outlier_method,
        config.outlier_threshold,
        config.outlier_action,
    )
    .expect("outlier stage");
    let resampled = resample(&cleaned.frame, config.resample.as_ref().unwrap())
        .expect("resample stage");
    let manual = engineer_features(&resampled, config.features.as_ref().unwrap())
        .expect("feature stage");

    assert!(outcome.frame.equals_missing(&manual));
    assert_eq!(outcome.report.outliers_affected, cleaned.affected);
}

#[test]
fn report_describes_the_run() {
    let df = second_spaced(&[Some(1.0), None, Some(100.0), Some(3.0)]);
    let outcome = run_pipeline(&df, &full_config()).expect("pipeline succeeded");

    assert_eq!(outcome.report.input_points, 4);
    assert_eq!(outcome.report.outliers_affected, 1);
    assert!(outcome.report.resampled);
    assert_eq!(
        outcome.report.feature_columns,
        vec![
            "lag_1",
            "rolling_mean_2",
            "rolling_std_2",
            "rolling_min_2",
            "rolling_max_2",
        ]
    );
    assert_eq!(outcome.report.output_points, outcome.frame.height());
}

#[test]
fn optional_stages_are_skipped_when_not_configured() {
    let df = second_spaced(&[Some(1.0), Some(2.0), Some(100.0), Some(3.0)]);
    let config = PipelineConfig {
        outlier_threshold: 1.0,
        ..PipelineConfig::default()
    };

    let outcome = run_pipeline(&df, &config).expect("pipeline succeeded");

    assert!(!outcome.report.resampled);
    assert!(outcome.report.feature_columns.is_empty());
    // default action removes the flagged spike
    assert_eq!(outcome.report.output_points, 3);
    assert_eq!(outcome.frame.width(), 2);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let df = second_spaced(&[Some(1.0), Some(2.0)]);
    let config = PipelineConfig {
        outlier_threshold: -1.0,
        ..PipelineConfig::default()
    };

    let err = run_pipeline(&df, &config).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { .. }));
}
