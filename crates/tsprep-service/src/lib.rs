//! Application workflows: preprocess -> persist, feature engineering, validation.

mod service;

pub use service::{FeatureSummary, PreprocessSummary, PreprocessingService, ServiceError};
