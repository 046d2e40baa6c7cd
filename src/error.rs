//! Error taxonomy for the ROI engine.
//!
//! Every failure is raised at the point of detection and is final: the
//! computations are deterministic, so nothing here is retried.

use crate::segment::ValueSegment;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoiError {
    /// Malformed or out-of-range arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A value segment has no members, so its CLV is undefined.
    #[error("Segment {0} has no customers")]
    EmptySegment(ValueSegment),

    #[error("Unknown metric: {0}")]
    MetricNotFound(String),

    #[error("Table error: {0}")]
    Data(#[from] PolarsError),
}

impl RoiError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RoiError::InvalidInput(reason.into())
    }
}

/// Result type alias for engine operations.
pub type RoiResult<T> = Result<T, RoiError>;
