// crates/tsprep-core/src/error.rs

use std::fmt;

use thiserror::Error;

/// Pipeline stage names, carried by errors so callers can tell which step
/// rejected the input without inspecting internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Missing,
    Outlier,
    Resample,
    Features,
    Profile,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Missing => "missing",
            Stage::Outlier => "outlier",
            Stage::Resample => "resample",
            Stage::Features => "features",
            Stage::Profile => "profile",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input in {stage} stage: {reason}")]
    InvalidInput { stage: Stage, reason: String },

    #[error("invalid configuration for {stage} stage: {reason}")]
    Configuration { stage: Stage, reason: String },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data processing error: {0}")]
    Processing(String),
}

impl PipelineError {
    pub fn invalid_input(stage: Stage, reason: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    pub fn configuration(stage: Stage, reason: impl Into<String>) -> Self {
        PipelineError::Configuration {
            stage,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
