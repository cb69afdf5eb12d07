//! Error types for the analytics engine.
//!
//! Every variant is a recoverable condition the caller is expected to report.
//! None of them is ever replaced by a default value inside the engine.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed filter bounds or an empty required set
    #[error("Invalid filter criteria: {0}")]
    InvalidCriteria(String),

    /// Aggregation spec that cannot form groups
    #[error("Invalid aggregation: {0}")]
    InvalidAggregate(String),

    /// Trend fit requested on fewer than two points
    #[error("Insufficient data for a trend fit: {points} point(s), at least 2 required")]
    InsufficientData { points: usize },

    /// Trend fit requested on a series whose years are all identical
    #[error("Degenerate trend input: every point has year {year}")]
    DegenerateInput { year: i32 },

    /// Negative ranking limit
    #[error("Invalid ranking limit: {0}")]
    InvalidLimit(i64),

    /// Ranking requested on a metric the rows do not carry
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
