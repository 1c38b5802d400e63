//! Error types for threshold declarations and summary export

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("empty threshold expression")]
    Empty,

    #[error("unknown aggregation in threshold '{0}'")]
    UnknownAggregation(String),

    #[error("invalid percentile in threshold '{0}', expected p(N) with 0 < N <= 100")]
    InvalidPercentile(String),

    #[error("missing comparison operator in threshold '{0}'")]
    MissingOperator(String),

    #[error("invalid bound in threshold '{0}'")]
    InvalidBound(String),
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("failed to encode run summary: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write run summary to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
